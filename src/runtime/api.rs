//! API-facing request/response models for the intake layer.

use serde::{Deserialize, Serialize};

use crate::core::{
    AllocationError, AllocationManager, AllocationStore, Assignment, OpenVisitRequest,
    OpenVisitSummary, PatientId, WorkerId, DEFAULT_PRIORITY,
};

/// Open-visit submission as received on the wire.
///
/// Every field is optional here so a missing one surfaces as a validation
/// error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenVisitPayload {
    /// Patient identifier (required).
    pub patient_id: Option<PatientId>,
    /// Intake worker identifier (required).
    pub worker_id: Option<WorkerId>,
    /// Request origin (required).
    pub origin: Option<String>,
    /// Priority, defaults to 3.
    pub priority: Option<i32>,
    /// Free-text reason, defaults to empty.
    pub reason: Option<String>,
}

impl TryFrom<OpenVisitPayload> for OpenVisitRequest {
    type Error = AllocationError;

    fn try_from(payload: OpenVisitPayload) -> Result<Self, Self::Error> {
        let patient_id = payload
            .patient_id
            .ok_or_else(|| AllocationError::Validation("patient_id is required".into()))?;
        let worker_id = payload
            .worker_id
            .ok_or_else(|| AllocationError::Validation("worker_id is required".into()))?;
        let origin = payload
            .origin
            .ok_or_else(|| AllocationError::Validation("origin is required".into()))?;

        let request = Self::new(patient_id, worker_id, origin)
            .with_priority(payload.priority.unwrap_or(DEFAULT_PRIORITY))
            .with_reason(payload.reason.unwrap_or_default());
        request.validate()?;
        Ok(request)
    }
}

/// Close-visit submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CloseVisitPayload {
    /// Folio of the visit to close (required).
    pub folio: Option<String>,
}

/// Close-visit response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseVisitResponse {
    /// Folio that was closed.
    pub folio: String,
    /// Always true on success.
    pub closed: bool,
}

/// Error payload returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
    /// Whether retrying the whole call later may succeed.
    pub retryable: bool,
}

impl From<&AllocationError> for ErrorResponse {
    fn from(err: &AllocationError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<AllocationError> for ErrorResponse {
    fn from(err: AllocationError) -> Self {
        Self::from(&err)
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Validate a payload and open a visit.
///
/// # Errors
/// Returns the [`ErrorResponse`] for any [`AllocationError`].
pub fn open_visit<S: AllocationStore>(
    manager: &AllocationManager<S>,
    payload: OpenVisitPayload,
) -> Result<Assignment, ErrorResponse> {
    let request = OpenVisitRequest::try_from(payload)?;
    Ok(manager.open_visit(&request)?)
}

/// Close a visit by folio.
///
/// # Errors
/// Returns the [`ErrorResponse`] for any [`AllocationError`].
pub fn close_visit<S: AllocationStore>(
    manager: &AllocationManager<S>,
    payload: CloseVisitPayload,
) -> Result<CloseVisitResponse, ErrorResponse> {
    let folio = payload
        .folio
        .ok_or_else(|| AllocationError::Validation("folio is required".into()))?;
    manager.close_visit(&folio)?;
    Ok(CloseVisitResponse {
        folio,
        closed: true,
    })
}

/// OPEN visits, newest first.
///
/// # Errors
/// Returns the [`ErrorResponse`] for a store failure.
pub fn list_open_visits<S: AllocationStore>(
    manager: &AllocationManager<S>,
) -> Result<Vec<OpenVisitSummary>, ErrorResponse> {
    Ok(manager.list_open_visits()?)
}

/// Return a health payload.
#[must_use]
pub const fn health() -> Health {
    Health { ok: true }
}
