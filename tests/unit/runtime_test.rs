//! Tests for API models and the tokio adapter

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use er_allocator::core::{AllocationManager, BedRef, OpenVisitRequest};
use er_allocator::infra::InMemoryStore;
use er_allocator::runtime::{
    close_visit, health, list_open_visits, open_visit, CloseVisitPayload, OpenVisitPayload,
    TokioAllocator, VisitService,
};
use er_allocator::util::init_tracing;

fn seeded_manager() -> AllocationManager<InMemoryStore> {
    let store = InMemoryStore::new();
    store.add_doctor(1);
    store.add_bed(BedRef::new(1, 1));
    AllocationManager::new(store)
}

#[test]
fn test_payload_defaults_from_json() {
    let payload: OpenVisitPayload =
        serde_json::from_str(r#"{"patient_id": 1, "worker_id": 9, "origin": "walk-in"}"#).unwrap();
    let request = OpenVisitRequest::try_from(payload).unwrap();
    assert_eq!(request.priority, 3);
    assert_eq!(request.reason, "");
}

#[test]
fn test_missing_field_is_validation_error() {
    let manager = seeded_manager();
    let payload: OpenVisitPayload =
        serde_json::from_str(r#"{"patient_id": 1, "origin": "walk-in"}"#).unwrap();

    let err = open_visit(&manager, payload).unwrap_err();
    assert_eq!(err.kind, "validation_error");
    assert!(err.message.contains("worker_id"));
    assert!(!err.retryable);
    // Nothing was claimed.
    assert!(manager.store().doctor(1).unwrap().available);
}

#[test]
fn test_open_list_close_round() {
    let manager = seeded_manager();
    let assignment = open_visit(
        &manager,
        OpenVisitPayload {
            patient_id: Some(1),
            worker_id: Some(9),
            origin: Some("walk-in".into()),
            priority: Some(2),
            reason: Some("fracture".into()),
        },
    )
    .unwrap();

    let open = list_open_visits(&manager).unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].priority, 2);
    assert_eq!(open[0].reason, "fracture");

    let closed = close_visit(
        &manager,
        CloseVisitPayload {
            folio: Some(assignment.folio.clone()),
        },
    )
    .unwrap();
    assert!(closed.closed);
    assert_eq!(closed.folio, assignment.folio);

    let again = close_visit(
        &manager,
        CloseVisitPayload {
            folio: Some(assignment.folio),
        },
    )
    .unwrap_err();
    assert_eq!(again.kind, "visit_not_found_or_already_closed");
}

#[test]
fn test_exhausted_pool_is_retryable() {
    let manager = AllocationManager::new(InMemoryStore::new());
    let err = open_visit(
        &manager,
        OpenVisitPayload {
            patient_id: Some(1),
            worker_id: Some(9),
            origin: Some("walk-in".into()),
            ..OpenVisitPayload::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.kind, "no_doctor_available");
    assert!(err.retryable);
    assert!(health().ok);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_tokio_allocator_round_trip() {
    let allocator = TokioAllocator::try_current(Arc::new(seeded_manager())).unwrap();

    let assignment = allocator
        .open_visit(OpenVisitRequest::new(5, 9, "ambulance"))
        .await
        .unwrap();
    assert_eq!(assignment.doctor_id, 1);
    assert_eq!(allocator.list_open_visits().await.unwrap().len(), 1);

    allocator.close_visit(assignment.folio).await.unwrap();
    assert!(allocator.list_open_visits().await.unwrap().is_empty());
    assert!(allocator.manager().store().doctor(1).unwrap().available);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tokio_allocator_concurrent_opens_share_pool() {
    let store = InMemoryStore::new();
    for id in 1..=3 {
        store.add_doctor(id);
        store.add_bed(BedRef::new(1, id));
    }
    let allocator = TokioAllocator::try_current(Arc::new(AllocationManager::new(store))).unwrap();

    let results = join_all(
        (0..6).map(|i| allocator.open_visit(OpenVisitRequest::new(i, 9, "walk-in"))),
    )
    .await;

    let assigned: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(assigned.len(), 3);
    let doctors: HashSet<i64> = assigned.iter().map(|a| a.doctor_id).collect();
    assert_eq!(doctors.len(), 3);
    for result in &results {
        if let Err(err) = result {
            assert!(err.is_retryable(), "unexpected error: {err}");
        }
    }
    assert_eq!(allocator.list_open_visits().await.unwrap().len(), 3);
}

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialised twice");
}
