//! Error types for allocation operations.

use thiserror::Error;

/// Errors produced by the selector, the allocation manager and store backends.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// A required payload field is missing or malformed.
    #[error("validation error: {0}")]
    Validation(String),
    /// No active, available doctor existed at selection time.
    #[error("no doctor available")]
    NoDoctorAvailable,
    /// No free bed existed at selection time.
    #[error("no bed available")]
    NoBedAvailable,
    /// A proposed resource was claimed by a concurrent operation first.
    #[error("resource contention, retry with a fresh selection")]
    ResourceContention,
    /// Close target does not exist or is not open anymore.
    #[error("visit not found or already closed: {0}")]
    VisitNotFoundOrAlreadyClosed(String),
    /// Store failure with context.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl AllocationError {
    /// Whether the caller may retry the whole operation later.
    ///
    /// No retry happens inside the allocator itself.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NoDoctorAvailable | Self::NoBedAvailable | Self::ResourceContention
        )
    }

    /// Stable machine-readable kind, used in API error payloads and audit records.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::NoDoctorAvailable => "no_doctor_available",
            Self::NoBedAvailable => "no_bed_available",
            Self::ResourceContention => "resource_contention",
            Self::VisitNotFoundOrAlreadyClosed(_) => "visit_not_found_or_already_closed",
            Self::StoreUnavailable(_) => "store_unavailable",
        }
    }
}

impl From<rusqlite::Error> for AllocationError {
    fn from(err: rusqlite::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
