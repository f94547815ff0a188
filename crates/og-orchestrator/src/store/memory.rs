//! In-memory session store

use async_trait::async_trait;
use dashmap::DashMap;

use og_core::error::StoreError;
use og_core::traits::SessionStore;
use og_core::SessionBlob;

/// Session store backed by a process-local map
#[derive(Default)]
pub struct MemorySessionStore {
    blobs: DashMap<String, SessionBlob>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn fetch(&self, key: &str) -> Result<Option<SessionBlob>, StoreError> {
        Ok(self.blobs.get(key).map(|r| r.value().clone()))
    }

    async fn put(&self, key: &str, blob: &SessionBlob) -> Result<(), StoreError> {
        self.blobs.insert(key.to_string(), blob.clone());
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.blobs.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.blobs.remove(key);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
