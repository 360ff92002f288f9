use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{AppError, Result};
use crate::storage::{validate_name, BlobStore};

/// In-memory blob store for tests
#[derive(Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<String, Bytes>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.blobs.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl BlobStore for MemoryStorage {
    async fn put(&self, name: &str, data: Bytes) -> Result<()> {
        validate_name(name)?;
        self.blobs.lock().unwrap().insert(name.to_string(), data);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        self.blobs
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| AppError::BlobMissing(name.to_string()))
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.blobs.lock().unwrap().contains_key(name))
    }

    fn storage_type(&self) -> &'static str {
        "memory"
    }
}
