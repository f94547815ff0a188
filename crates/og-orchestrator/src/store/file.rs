//! Directory-backed session store

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use og_core::error::StoreError;
use og_core::traits::SessionStore;
use og_core::SessionBlob;

use crate::cache::write_atomic;

/// Session store keeping one file per key under a root directory.
///
/// Keys may contain `/` to nest files, but never `..` or an absolute path.
pub struct FileSessionStore {
    root: PathBuf,
}

impl FileSessionStore {
    /// Store rooted at `root` (created on first write)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn fetch(&self, key: &str) -> Result<Option<SessionBlob>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(SessionBlob::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, blob: &SessionBlob) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        write_atomic(&path, blob.as_bytes()).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
