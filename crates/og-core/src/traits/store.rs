//! Session store trait

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::SessionBlob;

/// Durable key/blob store holding one session per account
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a blob. Returns `Ok(None)` if the key does not exist.
    async fn fetch(&self, key: &str) -> Result<Option<SessionBlob>, StoreError>;

    /// Store a blob, replacing any previous value
    async fn put(&self, key: &str, blob: &SessionBlob) -> Result<(), StoreError>;

    /// Check whether a blob exists for the key
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Remove a blob. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;
}
