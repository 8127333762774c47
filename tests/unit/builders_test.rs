//! Tests for builder modules

use er_allocator::builders::{build_manager, build_store};
use er_allocator::config::{AllocatorConfig, LockMode, StoreBackendConfig};
use er_allocator::core::{AllocationError, AllocationStore, OpenVisitRequest};

fn temp_db() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("er-builder-{}.db", uuid::Uuid::new_v4()))
}

#[test]
fn test_build_in_memory_store() {
    let cfg = AllocatorConfig {
        lock_mode: LockMode::PerStatement,
        ..AllocatorConfig::default()
    };
    let store = build_store(&cfg).unwrap();
    assert!(store.list_open_visits().unwrap().is_empty());
}

#[test]
fn test_build_rejects_invalid_config() {
    let cfg = AllocatorConfig {
        backend: StoreBackendConfig::Sqlite,
        sqlite_path: None,
        ..AllocatorConfig::default()
    };
    assert!(matches!(build_store(&cfg), Err(AllocationError::Validation(_))));
}

#[test]
fn test_build_sqlite_manager() {
    let manager = build_manager(&AllocatorConfig::sqlite(temp_db())).unwrap();
    // Empty pools: the request is valid but nothing can be assigned.
    let result = manager.open_visit(&OpenVisitRequest::new(1, 9, "walk-in"));
    assert!(matches!(result, Err(AllocationError::NoDoctorAvailable)));
}
