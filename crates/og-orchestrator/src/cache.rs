//! Local session cache
//!
//! One file per account on the executing host. The session client reads it on
//! connect and rewrites it after a successful sign-in; the login task copies
//! it to and from the remote store and deletes it when the service rejects it.

use std::io;
use std::path::{Path, PathBuf};

use og_core::SessionBlob;

/// Cached session file for one account
#[derive(Debug, Clone)]
pub struct LocalSessionCache {
    path: PathBuf,
}

impl LocalSessionCache {
    /// Cache backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached blob.
    ///
    /// Returns `Ok(None)` if the file does not exist or is empty.
    pub async fn load(&self) -> io::Result<Option<SessionBlob>> {
        match tokio::fs::read(&self.path).await {
            Ok(data) if data.is_empty() => Ok(None),
            Ok(data) => Ok(Some(SessionBlob::from(data))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Replace the cached blob.
    ///
    /// Writes to a sibling temp file and renames it into place so a reader
    /// never sees a half-written session.
    pub async fn save(&self, blob: &SessionBlob) -> io::Result<()> {
        write_atomic(&self.path, blob.as_bytes()).await
    }

    /// Delete the cached blob. Missing files are not an error.
    pub async fn remove(&self) -> io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Write `data` to `path` through a temp file in the same directory
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = std::ffi::OsString::from(".");
    tmp_name.push(file_name);
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, path).await
}
