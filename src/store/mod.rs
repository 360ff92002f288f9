pub mod sqlite;

pub use sqlite::*;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewStudent, Student};

/// Document store for student records
#[async_trait]
pub trait StudentStore: Send + Sync {
    /// All records, in insertion order
    async fn find_all(&self) -> Result<Vec<Student>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Student>>;

    /// Records whose `parent` equals `parent`
    async fn find_by_parent(&self, parent: &str) -> Result<Vec<Student>>;

    /// Persist a new record under a freshly assigned id
    async fn insert(&self, student: NewStudent) -> Result<Student>;

    /// Overwrite an existing record. Returns false if the id is gone.
    async fn save(&self, student: &Student) -> Result<bool>;

    /// Bulk delete by parent, returning the number of removed records
    async fn delete_by_parent(&self, parent: &str) -> Result<u64>;

    /// Delete a record and return it, or `None` if nothing matched
    async fn delete_by_id(&self, id: &str) -> Result<Option<Student>>;
}
