//! Audit sink implementations.
//!
//! Provides an in-memory ring buffer and a tracing-backed sink. Events are
//! recorded after the transaction outcome is known and never influence it.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::model::{BedRef, DoctorId};
use crate::util::clock::now_utc;

/// What happened to an allocation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Visit opened, doctor and bed claimed.
    Open,
    /// Visit closed, doctor and bed released.
    Close,
    /// A claim lost a race.
    Contention,
    /// A claimed doctor was released after the bed claim failed.
    Compensate,
    /// Call rejected without touching resources.
    Rejected,
}

impl AuditAction {
    /// Lowercase action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Contention => "contention",
            Self::Compensate => "compensate",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit event structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationEvent {
    /// Event identifier.
    pub event_id: String,
    /// Action taken.
    pub action: AuditAction,
    /// Visit folio, when one exists.
    pub folio: Option<String>,
    /// Doctor involved.
    pub doctor_id: Option<DoctorId>,
    /// Bed involved.
    pub bed: Option<BedRef>,
    /// Event timestamp.
    pub created_at: DateTime<Utc>,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: AllocationEvent);
}

/// In-memory audit sink for testing and dev. Clones share one buffer.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AllocationEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AllocationEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Events with the given action.
    #[must_use]
    pub fn events_with(&self, action: AuditAction) -> Vec<AllocationEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AllocationEvent) {
        let mut events = self.events.lock();
        if self.max_events == 0 {
            return;
        }
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Sink that emits each event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AllocationEvent) {
        tracing::info!(
            target: "er_allocator::audit",
            event_id = %event.event_id,
            action = %event.action,
            folio = ?event.folio,
            doctor_id = ?event.doctor_id,
            bed = ?event.bed,
            detail = ?event.detail,
            "allocation event"
        );
    }
}

/// Helper to build an audit event stamped with a fresh id and the current time.
#[must_use]
pub fn build_audit_event(
    action: AuditAction,
    folio: Option<String>,
    doctor_id: Option<DoctorId>,
    bed: Option<BedRef>,
    detail: Option<String>,
) -> AllocationEvent {
    AllocationEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        action,
        folio,
        doctor_id,
        bed,
        created_at: now_utc(),
        detail,
    }
}
