//! In-process object store
//!
//! Keeps uploads in a map. Used by tests and local runs without S3.

use std::collections::HashMap;
use std::sync::RwLock;

use axum::async_trait;

use super::{ObjectStore, public_url_for};
use crate::error::AppError;

/// A stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
}

/// Object store holding everything in memory
pub struct MemoryObjectStore {
    public_url: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new(public_url: impl Into<String>) -> Self {
        Self {
            public_url: public_url.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Copy of the object stored under `key`
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(key).cloned())
    }

    pub fn len(&self) -> usize {
        self.objects.read().map(|objects| objects.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let mut objects = self
            .objects
            .write()
            .map_err(|_| AppError::Storage("object map lock poisoned".to_string()))?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );

        Ok(public_url_for(&self.public_url, key))
    }
}
