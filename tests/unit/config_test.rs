//! Tests for configuration validation

use std::collections::HashMap;
use std::path::PathBuf;

use er_allocator::config::{AllocatorConfig, LockMode, StoreBackendConfig, DEFAULT_BUSY_TIMEOUT_MS};

#[test]
fn test_default_config_is_valid() {
    let cfg = AllocatorConfig::default();
    assert_eq!(cfg.backend, StoreBackendConfig::InMemory);
    assert_eq!(cfg.lock_mode, LockMode::Immediate);
    assert_eq!(cfg.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_sqlite_requires_path() {
    let cfg = AllocatorConfig {
        backend: StoreBackendConfig::Sqlite,
        ..AllocatorConfig::default()
    };
    assert!(cfg.validate().is_err());
    assert!(AllocatorConfig::sqlite("/tmp/er.db").validate().is_ok());
}

#[test]
fn test_zero_busy_timeout_invalid() {
    let cfg = AllocatorConfig {
        busy_timeout_ms: 0,
        ..AllocatorConfig::default()
    };
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "backend": "sqlite",
        "sqlite_path": "/var/lib/er/room1.db",
        "busy_timeout_ms": 2500
    }"#;

    let cfg = AllocatorConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.backend, StoreBackendConfig::Sqlite);
    assert_eq!(cfg.sqlite_path, Some(PathBuf::from("/var/lib/er/room1.db")));
    assert_eq!(cfg.busy_timeout_ms, 2500);
    assert_eq!(cfg.lock_mode, LockMode::Immediate);
}

#[test]
fn test_config_from_json_rejects_unknown_backend() {
    assert!(AllocatorConfig::from_json_str(r#"{"backend": "postgres"}"#).is_err());
    assert!(AllocatorConfig::from_json_str(r#"{"backend": "sqlite"}"#).is_err());
}

#[test]
fn test_config_from_lookup() {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("ER_STORE_BACKEND", "in_memory"),
        ("ER_LOCK_MODE", "per_statement"),
        ("ER_BUSY_TIMEOUT_MS", "750"),
    ]);
    let cfg = AllocatorConfig::from_lookup(|key| vars.get(key).map(ToString::to_string)).unwrap();
    assert_eq!(cfg.backend, StoreBackendConfig::InMemory);
    assert_eq!(cfg.lock_mode, LockMode::PerStatement);
    assert_eq!(cfg.busy_timeout_ms, 750);
}

#[test]
fn test_config_from_lookup_bad_values() {
    let bad_mode = AllocatorConfig::from_lookup(|key| {
        (key == "ER_LOCK_MODE").then(|| "sometimes".to_string())
    });
    assert!(bad_mode.is_err());

    let bad_timeout = AllocatorConfig::from_lookup(|key| {
        (key == "ER_BUSY_TIMEOUT_MS").then(|| "soon".to_string())
    });
    let message = format!("{:#}", bad_timeout.unwrap_err());
    assert!(message.contains("ER_BUSY_TIMEOUT_MS"));

    let missing_path = AllocatorConfig::from_lookup(|key| {
        (key == "ER_STORE_BACKEND").then(|| "sqlite".to_string())
    });
    assert!(missing_path.is_err());
}
