//! Builders to construct the configured store backend.

use std::time::Duration;

use crate::config::{AllocatorConfig, StoreBackendConfig};
use crate::core::{AllocationError, AllocationManager, AllocationStore};
use crate::infra::{InMemoryStore, SqliteStore};

/// Store selected at runtime from configuration.
pub type DynStore = Box<dyn AllocationStore>;

/// Build the store backend described by `cfg`.
///
/// # Errors
/// Returns [`AllocationError::Validation`] for an invalid configuration and
/// [`AllocationError::StoreUnavailable`] if the SQLite file cannot be opened.
pub fn build_store(cfg: &AllocatorConfig) -> Result<DynStore, AllocationError> {
    cfg.validate()
        .map_err(|e| AllocationError::Validation(format!("config invalid: {e}")))?;

    match cfg.backend {
        StoreBackendConfig::InMemory => {
            tracing::info!(lock_mode = ?cfg.lock_mode, "using in-memory store");
            Ok(Box::new(InMemoryStore::with_lock_mode(cfg.lock_mode)))
        }
        StoreBackendConfig::Sqlite => {
            let path = cfg.sqlite_path.as_ref().ok_or_else(|| {
                AllocationError::Validation("sqlite_path is required for the sqlite backend".into())
            })?;
            let store = SqliteStore::open(path, Duration::from_millis(cfg.busy_timeout_ms))?;
            tracing::info!(path = %path.display(), "using sqlite store");
            Ok(Box::new(store))
        }
    }
}

/// Build an [`AllocationManager`] over the configured store.
///
/// # Errors
/// See [`build_store`].
pub fn build_manager(cfg: &AllocatorConfig) -> Result<AllocationManager<DynStore>, AllocationError> {
    build_store(cfg).map(AllocationManager::new)
}
