//! Resource pool rows, visit records, and the open-visit payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::AllocationError;

/// Doctor identity.
pub type DoctorId = i64;
/// Room identity.
pub type RoomId = i64;
/// Bed identity, unique within its room.
pub type BedId = i64;
/// Patient identity.
pub type PatientId = i64;
/// Intake-worker identity.
pub type WorkerId = i64;

/// Priority recorded when the caller does not provide one.
pub const DEFAULT_PRIORITY: i32 = 3;

/// A doctor in the resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Doctor {
    /// Doctor identity.
    pub id: DoctorId,
    /// Eligible for assignment at all.
    pub active: bool,
    /// Currently unassigned.
    pub available: bool,
}

/// Occupancy of a bed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BedStatus {
    /// Not bound to any open visit.
    Free,
    /// Bound to exactly one open visit.
    Occupied,
}

impl BedStatus {
    /// Column value used by SQL backends.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Occupied => "OCCUPIED",
        }
    }
}

/// Location of a bed: beds are keyed by room and bed id together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BedRef {
    /// Room the bed belongs to.
    pub room_id: RoomId,
    /// Bed identity.
    pub bed_id: BedId,
}

impl BedRef {
    /// Build a bed reference.
    #[must_use]
    pub const fn new(room_id: RoomId, bed_id: BedId) -> Self {
        Self { room_id, bed_id }
    }
}

/// A bed in the resource pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    /// Room and bed identity.
    pub location: BedRef,
    /// Current occupancy.
    pub status: BedStatus,
}

/// Lifecycle status of a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VisitStatus {
    /// Resources are held.
    Open,
    /// Historical record only.
    Closed,
}

impl VisitStatus {
    /// Column value used by SQL backends.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }

    /// Parse a column value.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] for unknown values.
    pub fn parse(value: &str) -> Result<Self, AllocationError> {
        match value {
            "OPEN" => Ok(Self::Open),
            "CLOSED" => Ok(Self::Closed),
            other => Err(AllocationError::StoreUnavailable(format!(
                "unknown visit status `{other}`"
            ))),
        }
    }
}

/// Active, available doctor together with the number of open visits it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoctorLoad {
    /// Doctor identity.
    pub doctor_id: DoctorId,
    /// Count of OPEN visits referencing this doctor.
    pub open_visits: u32,
}

/// An emergency-room visit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    /// Store-assigned folio.
    pub folio: String,
    /// Patient being seen.
    pub patient_id: PatientId,
    /// Assigned doctor.
    pub doctor_id: DoctorId,
    /// Intake worker who opened the visit.
    pub worker_id: WorkerId,
    /// Assigned room.
    pub room_id: RoomId,
    /// Assigned bed.
    pub bed_id: BedId,
    /// Where the request came from.
    pub origin: String,
    /// Recorded priority; data only, never used for ordering.
    pub priority: i32,
    /// Free-text reason.
    pub reason: String,
    /// When the visit was opened.
    pub opened_at: DateTime<Utc>,
    /// When the visit was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: VisitStatus,
}

impl Visit {
    /// Bed bound to this visit.
    #[must_use]
    pub const fn bed(&self) -> BedRef {
        BedRef::new(self.room_id, self.bed_id)
    }
}

/// Fields inserted for a new OPEN visit; the store assigns the folio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVisit {
    /// Patient being seen.
    pub patient_id: PatientId,
    /// Claimed doctor.
    pub doctor_id: DoctorId,
    /// Intake worker.
    pub worker_id: WorkerId,
    /// Claimed bed.
    pub bed: BedRef,
    /// Request origin.
    pub origin: String,
    /// Recorded priority.
    pub priority: i32,
    /// Free-text reason.
    pub reason: String,
    /// Open timestamp.
    pub opened_at: DateTime<Utc>,
}

/// Validated input of an open-visit call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenVisitRequest {
    /// Patient being seen.
    pub patient_id: PatientId,
    /// Intake worker opening the visit.
    pub worker_id: WorkerId,
    /// Request origin (walk-in, ambulance, referral, ...).
    pub origin: String,
    /// Priority, defaults to [`DEFAULT_PRIORITY`].
    pub priority: i32,
    /// Free-text reason, defaults to empty.
    pub reason: String,
}

impl OpenVisitRequest {
    /// Create a request with default priority and empty reason.
    pub fn new(patient_id: PatientId, worker_id: WorkerId, origin: impl Into<String>) -> Self {
        Self {
            patient_id,
            worker_id,
            origin: origin.into(),
            priority: DEFAULT_PRIORITY,
            reason: String::new(),
        }
    }

    /// Set the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Check required fields before any store interaction.
    ///
    /// # Errors
    /// Returns [`AllocationError::Validation`] when `origin` is blank.
    pub fn validate(&self) -> Result<(), AllocationError> {
        if self.origin.trim().is_empty() {
            return Err(AllocationError::Validation("origin is required".into()));
        }
        Ok(())
    }
}

/// Result of a successful open-visit call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Folio of the new visit.
    pub folio: String,
    /// Claimed doctor.
    pub doctor_id: DoctorId,
    /// Claimed bed.
    pub bed_id: BedId,
    /// Room of the claimed bed.
    pub room_id: RoomId,
}

/// Row returned by open-visit listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenVisitSummary {
    /// Visit folio.
    pub folio: String,
    /// Patient being seen.
    pub patient_id: PatientId,
    /// Assigned doctor.
    pub doctor_id: DoctorId,
    /// Assigned room.
    pub room_id: RoomId,
    /// Assigned bed.
    pub bed_id: BedId,
    /// Recorded priority.
    pub priority: i32,
    /// Free-text reason.
    pub reason: String,
    /// Open timestamp.
    pub opened_at: DateTime<Utc>,
}

impl From<&Visit> for OpenVisitSummary {
    fn from(visit: &Visit) -> Self {
        Self {
            folio: visit.folio.clone(),
            patient_id: visit.patient_id,
            doctor_id: visit.doctor_id,
            room_id: visit.room_id,
            bed_id: visit.bed_id,
            priority: visit.priority,
            reason: visit.reason.clone(),
            opened_at: visit.opened_at,
        }
    }
}

/// Render a store identity as a folio (`ER-000042`).
#[must_use]
pub fn format_folio(id: i64) -> String {
    format!("ER-{id:06}")
}
