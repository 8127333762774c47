//! Store and allocator configuration structures.

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Default SQLite busy timeout in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackendConfig {
    /// In-memory tables for development/testing.
    #[default]
    InMemory,
    /// SQLite database file.
    Sqlite,
}

/// When an in-memory transaction takes the write lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// Lock held from `begin` until commit or rollback (like `BEGIN IMMEDIATE`).
    #[default]
    Immediate,
    /// Lock taken per statement; transactions interleave between statements.
    PerStatement,
}

const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

/// Root allocator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Backend selection.
    #[serde(default)]
    pub backend: StoreBackendConfig,
    /// Database file, required for the SQLite backend.
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
    /// How long a SQLite writer waits for the database lock.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Lock mode for the in-memory backend.
    #[serde(default)]
    pub lock_mode: LockMode,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackendConfig::InMemory,
            sqlite_path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            lock_mode: LockMode::Immediate,
        }
    }
}

impl AllocatorConfig {
    /// SQLite configuration for a database file.
    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackendConfig::Sqlite,
            sqlite_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.busy_timeout_ms == 0 {
            return Err("busy_timeout_ms must be greater than 0".into());
        }
        if self.backend == StoreBackendConfig::Sqlite {
            match &self.sqlite_path {
                None => return Err("sqlite_path is required for the sqlite backend".into()),
                Some(path) if path.as_os_str().is_empty() => {
                    return Err("sqlite_path must not be empty".into());
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    /// Returns a description of the parse or validation failure.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment, reading `.env` first if present.
    ///
    /// Recognized variables: `ER_STORE_BACKEND` (`in_memory` | `sqlite`),
    /// `ER_SQLITE_PATH`, `ER_BUSY_TIMEOUT_MS`, `ER_LOCK_MODE`
    /// (`immediate` | `per_statement`). Unset variables keep their defaults.
    ///
    /// # Errors
    /// Fails on unparseable values or an invalid resulting configuration.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    /// Fails on unparseable values or an invalid resulting configuration.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut cfg = Self::default();

        if let Some(raw) = lookup("ER_STORE_BACKEND") {
            cfg.backend = parse_variant(&raw).context("invalid ER_STORE_BACKEND")?;
        }
        if let Some(raw) = lookup("ER_SQLITE_PATH") {
            cfg.sqlite_path = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("ER_BUSY_TIMEOUT_MS") {
            cfg.busy_timeout_ms = raw
                .trim()
                .parse()
                .with_context(|| format!("invalid ER_BUSY_TIMEOUT_MS `{raw}`"))?;
        }
        if let Some(raw) = lookup("ER_LOCK_MODE") {
            cfg.lock_mode = parse_variant(&raw).context("invalid ER_LOCK_MODE")?;
        }

        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }
}

/// Parse a snake_case enum variant the same way the JSON config does.
fn parse_variant<T: for<'de> Deserialize<'de>>(raw: &str) -> AppResult<T> {
    let quoted = serde_json::Value::String(raw.trim().to_string());
    serde_json::from_value(quoted).with_context(|| format!("unknown value `{}`", raw.trim()))
}
