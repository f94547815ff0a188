//! Remote session stores
//!
//! Backends for [`SessionStore`]: an in-memory map, a directory on a durable
//! volume, and a plain HTTP object store.

mod file;
mod http;
mod memory;

pub use file::FileSessionStore;
pub use http::HttpSessionStore;
pub use memory::MemorySessionStore;

use std::sync::Arc;

use og_core::config::StoreConfig;
use og_core::error::OgError;
use og_core::traits::SessionStore;

/// Build the store selected in the configuration
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn SessionStore>, OgError> {
    let store: Arc<dyn SessionStore> = match config {
        StoreConfig::Memory => {
            tracing::warn!("Using in-memory session store; sessions will not survive a restart");
            Arc::new(MemorySessionStore::new())
        }
        StoreConfig::File { path } => Arc::new(FileSessionStore::new(path.clone())),
        StoreConfig::Http {
            base_url,
            request_timeout,
            ..
        } => Arc::new(HttpSessionStore::new(
            base_url.clone(),
            config.token()?,
            *request_timeout,
        )?),
    };

    tracing::info!("Session store: {}", store.name());
    Ok(store)
}
