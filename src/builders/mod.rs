//! Builders to construct stores and managers from configuration.

pub mod store_builder;

pub use store_builder::{build_manager, build_store, DynStore};
