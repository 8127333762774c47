//! Tests for audit sink

use er_allocator::core::{build_audit_event, AuditAction, AuditSink, InMemoryAuditSink};
use er_allocator::core::BedRef;

#[test]
fn test_in_memory_audit_sink() {
    let sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        AuditAction::Open,
        Some("ER-000001".to_string()),
        Some(4),
        Some(BedRef::new(1, 2)),
        None,
    );

    sink.record(event);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::Open);
    assert_eq!(events[0].folio.as_deref(), Some("ER-000001"));
    assert_eq!(events[0].doctor_id, Some(4));
}

#[test]
fn test_audit_sink_overflow() {
    let sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(AuditAction::Open, Some("a".into()), None, None, None));
    sink.record(build_audit_event(AuditAction::Close, Some("b".into()), None, None, None));
    sink.record(build_audit_event(AuditAction::Rejected, Some("c".into()), None, None, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].folio.as_deref(), Some("b")); // First one popped
    assert_eq!(events[1].folio.as_deref(), Some("c"));
}

#[test]
fn test_clones_share_buffer() {
    let sink = InMemoryAuditSink::new(4);
    let clone = sink.clone();
    clone.record(build_audit_event(AuditAction::Contention, None, Some(1), None, None));
    assert_eq!(sink.events_with(AuditAction::Contention).len(), 1);
    assert!(sink.events_with(AuditAction::Open).is_empty());
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        AuditAction::Compensate,
        None,
        Some(3),
        None,
        Some("bed claimed concurrently".to_string()),
    );

    assert!(!event.event_id.is_empty());
    assert_ne!(
        event.event_id,
        build_audit_event(AuditAction::Compensate, None, None, None, None).event_id
    );
    assert_eq!(event.action.as_str(), "compensate");
    assert_eq!(event.doctor_id, Some(3));
    assert_eq!(event.detail.as_deref(), Some("bed claimed concurrently"));
}
