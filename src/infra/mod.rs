//! Store backends: in-memory tables and SQLite.

pub mod memory;
pub mod sqlite;

pub use memory::{InMemoryStore, InMemoryTransaction};
pub use sqlite::{SqliteStore, SqliteTransaction};
