//! Store abstraction: an explicit transaction handle with conditional writes.
//!
//! Every claim or release is a single conditional write whose outcome is the
//! exact number of rows it changed. Callers treat "exactly one row" as proof
//! of ownership and never check-then-write.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::model::{BedRef, DoctorId, DoctorLoad, NewVisit, OpenVisitSummary, Visit};
use crate::core::AllocationError;

/// Transactional store holding doctors, beds and visits.
pub trait AllocationStore: Send + Sync {
    /// Begin a write transaction.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] if the store cannot be reached.
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, AllocationError>;

    /// OPEN visits ordered by `opened_at` descending.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    fn list_open_visits(&self) -> Result<Vec<OpenVisitSummary>, AllocationError>;
}

/// Handle on one open transaction.
///
/// Dropping a handle without calling [`StoreTransaction::commit`] rolls back.
pub trait StoreTransaction {
    /// Active and available doctors with their OPEN-visit count, in store identity order.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    fn doctor_loads(&mut self) -> Result<Vec<DoctorLoad>, AllocationError>;

    /// FREE beds in store order.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    fn free_beds(&mut self) -> Result<Vec<BedRef>, AllocationError>;

    /// Visit by folio.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    fn visit(&mut self, folio: &str) -> Result<Option<Visit>, AllocationError>;

    /// Set `available=false` where the doctor is currently available. Returns affected rows.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    fn claim_doctor(&mut self, doctor_id: DoctorId) -> Result<usize, AllocationError>;

    /// Set `available=true` unconditionally. Returns affected rows.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    fn release_doctor(&mut self, doctor_id: DoctorId) -> Result<usize, AllocationError>;

    /// Set `OCCUPIED` where the bed is currently `FREE`. Returns affected rows.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    fn claim_bed(&mut self, bed: BedRef) -> Result<usize, AllocationError>;

    /// Set `FREE` unconditionally. Returns affected rows.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    fn release_bed(&mut self, bed: BedRef) -> Result<usize, AllocationError>;

    /// Insert an OPEN visit and return the folio the store assigned.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    fn insert_visit(&mut self, visit: &NewVisit) -> Result<String, AllocationError>;

    /// Set `CLOSED` and `closed_at` where the visit is currently `OPEN`. Returns affected rows.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    fn close_visit(&mut self, folio: &str, closed_at: DateTime<Utc>)
        -> Result<usize, AllocationError>;

    /// Make every write of this transaction durable.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] if the commit fails; the
    /// transaction is rolled back in that case.
    fn commit(self: Box<Self>) -> Result<(), AllocationError>;

    /// Undo every write of this transaction.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    fn rollback(self: Box<Self>) -> Result<(), AllocationError>;
}

impl<S: AllocationStore + ?Sized> AllocationStore for Box<S> {
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, AllocationError> {
        (**self).begin()
    }

    fn list_open_visits(&self) -> Result<Vec<OpenVisitSummary>, AllocationError> {
        (**self).list_open_visits()
    }
}

impl<S: AllocationStore + ?Sized> AllocationStore for Arc<S> {
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, AllocationError> {
        (**self).begin()
    }

    fn list_open_visits(&self) -> Result<Vec<OpenVisitSummary>, AllocationError> {
        (**self).list_open_visits()
    }
}
