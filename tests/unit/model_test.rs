//! Tests for domain model types

use er_allocator::core::{
    format_folio, AllocationError, BedRef, BedStatus, OpenVisitRequest, VisitStatus,
    DEFAULT_PRIORITY,
};

#[test]
fn test_request_defaults() {
    let request = OpenVisitRequest::new(1, 9, "walk-in");
    assert_eq!(request.priority, DEFAULT_PRIORITY);
    assert_eq!(request.priority, 3);
    assert!(request.reason.is_empty());
    assert!(request.validate().is_ok());
}

#[test]
fn test_request_builder() {
    let request = OpenVisitRequest::new(1, 9, "ambulance")
        .with_priority(1)
        .with_reason("chest pain");
    assert_eq!(request.priority, 1);
    assert_eq!(request.reason, "chest pain");
}

#[test]
fn test_blank_origin_rejected() {
    let request = OpenVisitRequest::new(1, 9, "   ");
    assert!(matches!(
        request.validate(),
        Err(AllocationError::Validation(_))
    ));
}

#[test]
fn test_bed_ref_orders_by_room_then_bed() {
    assert!(BedRef::new(1, 9) < BedRef::new(2, 1));
    assert!(BedRef::new(2, 1) < BedRef::new(2, 3));
}

#[test]
fn test_status_wire_names() {
    assert_eq!(serde_json::to_string(&VisitStatus::Open).unwrap(), "\"OPEN\"");
    assert_eq!(serde_json::to_string(&BedStatus::Occupied).unwrap(), "\"OCCUPIED\"");
    assert_eq!(VisitStatus::parse("CLOSED").unwrap(), VisitStatus::Closed);
    assert!(VisitStatus::parse("ABIERTA").is_err());
}

#[test]
fn test_folio_format() {
    assert_eq!(format_folio(1), "ER-000001");
    assert_eq!(format_folio(1_234_567), "ER-1234567");
}
