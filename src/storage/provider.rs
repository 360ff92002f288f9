use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{AppError, Result};

/// Blob store keyed by file name
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store data under `name`, replacing any existing blob with that name
    async fn put(&self, name: &str, data: Bytes) -> Result<()>;

    /// Delete the blob called `name`.
    /// Fails with `AppError::BlobMissing` when there is no such blob.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Check if a blob exists
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Get the storage type name
    fn storage_type(&self) -> &'static str;
}

/// Reject names that would escape the blob directory
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0')
    {
        return Err(AppError::BadRequest(format!("Invalid file name: {:?}", name)));
    }
    Ok(())
}
