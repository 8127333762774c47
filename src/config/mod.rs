//! Configuration models for the store backend and allocator.

pub mod store;

pub use store::{AllocatorConfig, LockMode, StoreBackendConfig, DEFAULT_BUSY_TIMEOUT_MS};
