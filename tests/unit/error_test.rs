//! Tests for error types

use er_allocator::core::AllocationError;

#[test]
fn test_no_doctor_error() {
    let err = AllocationError::NoDoctorAvailable;
    assert_eq!(format!("{err}"), "no doctor available");
    assert!(err.is_retryable());
}

#[test]
fn test_no_bed_error() {
    let err = AllocationError::NoBedAvailable;
    assert_eq!(format!("{err}"), "no bed available");
    assert!(err.is_retryable());
}

#[test]
fn test_contention_error() {
    let err = AllocationError::ResourceContention;
    assert_eq!(err.kind(), "resource_contention");
    assert!(err.is_retryable());
}

#[test]
fn test_close_error() {
    let err = AllocationError::VisitNotFoundOrAlreadyClosed("ER-000007".to_string());
    assert_eq!(
        format!("{err}"),
        "visit not found or already closed: ER-000007"
    );
    assert!(!err.is_retryable());
}

#[test]
fn test_validation_and_store_errors_are_final() {
    let validation = AllocationError::Validation("origin is required".to_string());
    assert_eq!(format!("{validation}"), "validation error: origin is required");
    assert!(!validation.is_retryable());

    let store = AllocationError::StoreUnavailable("disk I/O error".to_string());
    assert_eq!(format!("{store}"), "store unavailable: disk I/O error");
    assert!(!store.is_retryable());
}

#[test]
fn test_sqlite_error_converts_to_store_unavailable() {
    let err: AllocationError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, AllocationError::StoreUnavailable(_)));
}
