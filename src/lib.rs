//! # ER Allocator
//!
//! Atomic doctor and bed allocation for emergency-room visits.
//!
//! Opening a visit claims one available doctor and one free bed and records
//! the visit, all inside a single store transaction. Closing the visit marks
//! it closed and releases both resources in one transaction. Many callers may
//! race for the same doctor or bed; the store arbitrates.
//!
//! ## How claims stay exclusive
//!
//! - **Proposal, then claim**: the selector proposes the least-loaded doctor
//!   and the first free bed by `(room, bed)`. A proposal may be stale.
//! - **Conditional writes**: a claim is an `UPDATE ... WHERE available` style
//!   write; only an affected-row count of exactly one proves ownership.
//! - **Compensation**: if the bed claim loses after the doctor was claimed,
//!   the doctor is released explicitly before the transaction rolls back.
//! - **Idempotent close**: only an `OPEN` visit can be closed, so a second
//!   close is rejected before any resource is touched.
//!
//! Failed calls are never retried internally. [`core::AllocationError::is_retryable`]
//! tells the caller whether a fresh attempt may succeed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use er_allocator::core::{AllocationManager, BedRef, OpenVisitRequest};
//! use er_allocator::infra::InMemoryStore;
//!
//! let store = InMemoryStore::new();
//! store.add_doctor(1);
//! store.add_bed(BedRef::new(1, 1));
//!
//! let manager = AllocationManager::new(store);
//! let assignment = manager.open_visit(&OpenVisitRequest::new(1, 9, "walk-in"))?;
//! manager.close_visit(&assignment.folio)?;
//! ```
//!
//! Backends: [`infra::InMemoryStore`] for development and tests,
//! [`infra::SqliteStore`] for a durable database file. See
//! [`builders::build_manager`] to pick one from [`config::AllocatorConfig`].

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Domain model, store contract, selector and allocation transactions.
pub mod core;
/// Configuration models for the store backend.
pub mod config;
/// Builders to construct stores and managers from configuration.
pub mod builders;
/// Store backends.
pub mod infra;
/// Runtime adapters and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
