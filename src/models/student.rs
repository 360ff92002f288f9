use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Student record
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Student {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Blob name of the profile image, empty when there is none
    pub profile: String,
    /// Id of the parent record, `None` for root-level records
    pub parent: Option<String>,
}

impl Student {
    pub fn has_profile(&self) -> bool {
        !self.profile.is_empty()
    }
}

/// Fields of a record about to be inserted; the store assigns the id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStudent {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub profile: String,
    pub parent: Option<String>,
}

/// Create request fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateStudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub parent: Option<String>,
}

/// Update request fields. Absent values clear the stored ones.
#[derive(Debug, Clone, Default)]
pub struct UpdateStudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Uploaded profile image
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Delete confirmation
#[derive(Debug, Serialize)]
pub struct DeleteStudentResponse {
    pub message: String,
    pub children_removed: u64,
}
