//! Open/close transactions over the doctor and bed pools.
//!
//! Each call runs as exactly one store transaction. Resources are claimed
//! with conditional writes; when the bed claim fails after the doctor was
//! claimed, the doctor claim is undone explicitly before the transaction is
//! rolled back, so the result is correct even on stores without
//! multi-statement rollback.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::core::audit::{build_audit_event, AllocationEvent, AuditAction, AuditSink};
use crate::core::model::{
    Assignment, BedRef, DoctorId, NewVisit, OpenVisitRequest, OpenVisitSummary, Visit,
};
use crate::core::selector::{select_bed, select_doctor};
use crate::core::store::{AllocationStore, StoreTransaction};
use crate::core::AllocationError;
use crate::util::clock::now_utc;

/// A resource claimed by the current attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Claim {
    Doctor(DoctorId),
    Bed(BedRef),
}

/// Claims made so far in one attempt, undone in reverse order on failure.
#[derive(Debug, Default)]
struct ClaimLedger {
    claims: Vec<Claim>,
}

impl ClaimLedger {
    fn record(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// Issue the inverse write for every recorded claim.
    fn compensate(
        &mut self,
        tx: &mut (dyn StoreTransaction + '_),
        trail: &mut Vec<AllocationEvent>,
    ) -> Result<(), AllocationError> {
        while let Some(claim) = self.claims.pop() {
            match claim {
                Claim::Doctor(doctor_id) => {
                    tx.release_doctor(doctor_id)?;
                    tracing::warn!(doctor_id, "compensated doctor claim");
                    trail.push(build_audit_event(
                        AuditAction::Compensate,
                        None,
                        Some(doctor_id),
                        None,
                        None,
                    ));
                }
                Claim::Bed(bed) => {
                    tx.release_bed(bed)?;
                    tracing::warn!(?bed, "compensated bed claim");
                    trail.push(build_audit_event(
                        AuditAction::Compensate,
                        None,
                        None,
                        Some(bed),
                        None,
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Allocates a doctor and a bed to each visit and releases them on close.
///
/// Holds no in-process locks or shared mutable state; concurrent calls are
/// coordinated only by the store.
pub struct AllocationManager<S> {
    store: S,
    audit: Option<Arc<dyn AuditSink>>,
}

impl<S> AllocationManager<S> {
    /// Create a manager over a store.
    pub fn new(store: S) -> Self {
        Self { store, audit: None }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    fn flush(&self, trail: Vec<AllocationEvent>) {
        if let Some(audit) = &self.audit {
            for event in trail {
                audit.record(event);
            }
        }
    }
}

impl<S: AllocationStore> AllocationManager<S> {
    /// Claim a doctor and a bed and record an OPEN visit, all or nothing.
    ///
    /// # Errors
    /// - [`AllocationError::Validation`] for a bad payload; nothing is read or written.
    /// - [`AllocationError::NoDoctorAvailable`] / [`AllocationError::NoBedAvailable`]
    ///   when a pool is empty.
    /// - [`AllocationError::ResourceContention`] when a proposal was claimed
    ///   concurrently; retry with a fresh call.
    /// - [`AllocationError::StoreUnavailable`] on backend failure.
    pub fn open_visit(&self, request: &OpenVisitRequest) -> Result<Assignment, AllocationError> {
        let mut trail = Vec::new();
        if let Err(err) = request.validate() {
            trail.push(rejection(&err, None));
            self.flush(trail);
            return Err(err);
        }

        let mut tx = self.store.begin()?;
        tracing::debug!(patient_id = request.patient_id, "open transaction started");

        let outcome = open_in(tx.as_mut(), request, now_utc(), &mut trail);
        let result = match outcome {
            Ok(assignment) => tx.commit().map(|()| assignment),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!(error = %rollback_err, "rollback after failed open");
                }
                Err(err)
            }
        };

        match &result {
            Ok(assignment) => {
                tracing::info!(
                    folio = %assignment.folio,
                    doctor_id = assignment.doctor_id,
                    room_id = assignment.room_id,
                    bed_id = assignment.bed_id,
                    "visit opened"
                );
                trail.push(build_audit_event(
                    AuditAction::Open,
                    Some(assignment.folio.clone()),
                    Some(assignment.doctor_id),
                    Some(BedRef::new(assignment.room_id, assignment.bed_id)),
                    None,
                ));
            }
            Err(AllocationError::ResourceContention) => {
                tracing::warn!(patient_id = request.patient_id, "open lost a race");
            }
            Err(err) => {
                tracing::warn!(patient_id = request.patient_id, error = %err, "open rejected");
                trail.push(rejection(err, None));
            }
        }
        self.flush(trail);
        result
    }

    /// Close an OPEN visit and release its doctor and bed.
    ///
    /// # Errors
    /// - [`AllocationError::Validation`] for an empty folio.
    /// - [`AllocationError::VisitNotFoundOrAlreadyClosed`] when the folio is
    ///   unknown or closed; no write is kept.
    /// - [`AllocationError::StoreUnavailable`] on backend failure.
    pub fn close_visit(&self, folio: &str) -> Result<(), AllocationError> {
        let mut trail = Vec::new();
        if folio.trim().is_empty() {
            let err = AllocationError::Validation("folio is required".into());
            trail.push(rejection(&err, None));
            self.flush(trail);
            return Err(err);
        }

        let mut tx = self.store.begin()?;
        tracing::debug!(folio, "close transaction started");

        let outcome = close_in(tx.as_mut(), folio, now_utc());
        let result = match outcome {
            Ok(visit) => tx.commit().map(|()| visit),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::error!(error = %rollback_err, "rollback after failed close");
                }
                Err(err)
            }
        };

        match result {
            Ok(visit) => {
                tracing::info!(
                    folio,
                    doctor_id = visit.doctor_id,
                    room_id = visit.room_id,
                    bed_id = visit.bed_id,
                    "visit closed"
                );
                trail.push(build_audit_event(
                    AuditAction::Close,
                    Some(visit.folio.clone()),
                    Some(visit.doctor_id),
                    Some(visit.bed()),
                    None,
                ));
                self.flush(trail);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(folio, error = %err, "close rejected");
                trail.push(rejection(&err, Some(folio.to_string())));
                self.flush(trail);
                Err(err)
            }
        }
    }

    /// OPEN visits, newest first.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] on backend failure.
    pub fn list_open_visits(&self) -> Result<Vec<OpenVisitSummary>, AllocationError> {
        self.store.list_open_visits()
    }
}

/// Body of the open transaction. The caller commits or rolls back.
fn open_in(
    tx: &mut (dyn StoreTransaction + '_),
    request: &OpenVisitRequest,
    opened_at: DateTime<Utc>,
    trail: &mut Vec<AllocationEvent>,
) -> Result<Assignment, AllocationError> {
    let doctor_id = select_doctor(tx)?.ok_or(AllocationError::NoDoctorAvailable)?;
    let bed = select_bed(tx)?.ok_or(AllocationError::NoBedAvailable)?;

    let mut ledger = ClaimLedger::default();

    if tx.claim_doctor(doctor_id)? != 1 {
        trail.push(build_audit_event(
            AuditAction::Contention,
            None,
            Some(doctor_id),
            None,
            Some("doctor claimed concurrently".into()),
        ));
        return Err(AllocationError::ResourceContention);
    }
    ledger.record(Claim::Doctor(doctor_id));

    if tx.claim_bed(bed)? != 1 {
        trail.push(build_audit_event(
            AuditAction::Contention,
            None,
            None,
            Some(bed),
            Some("bed claimed concurrently".into()),
        ));
        ledger.compensate(tx, trail)?;
        return Err(AllocationError::ResourceContention);
    }
    ledger.record(Claim::Bed(bed));

    let inserted = tx.insert_visit(&NewVisit {
        patient_id: request.patient_id,
        doctor_id,
        worker_id: request.worker_id,
        bed,
        origin: request.origin.clone(),
        priority: request.priority,
        reason: request.reason.clone(),
        opened_at,
    });
    let folio = match inserted {
        Ok(folio) => folio,
        Err(err) => {
            if let Err(compensation_err) = ledger.compensate(tx, trail) {
                tracing::error!(error = %compensation_err, "compensation after failed insert");
            }
            return Err(err);
        }
    };

    Ok(Assignment {
        folio,
        doctor_id,
        bed_id: bed.bed_id,
        room_id: bed.room_id,
    })
}

/// Body of the close transaction. The caller commits or rolls back.
fn close_in(
    tx: &mut (dyn StoreTransaction + '_),
    folio: &str,
    closed_at: DateTime<Utc>,
) -> Result<Visit, AllocationError> {
    if tx.close_visit(folio, closed_at)? != 1 {
        return Err(AllocationError::VisitNotFoundOrAlreadyClosed(folio.to_string()));
    }
    let visit = tx.visit(folio)?.ok_or_else(|| {
        AllocationError::StoreUnavailable(format!("visit {folio} vanished after close"))
    })?;

    if tx.release_doctor(visit.doctor_id)? != 1 {
        tracing::warn!(folio, doctor_id = visit.doctor_id, "doctor row missing on release");
    }
    if tx.release_bed(visit.bed())? != 1 {
        tracing::warn!(folio, bed = ?visit.bed(), "bed row missing on release");
    }
    Ok(visit)
}

fn rejection(err: &AllocationError, folio: Option<String>) -> AllocationEvent {
    build_audit_event(
        AuditAction::Rejected,
        folio,
        None,
        None,
        Some(err.kind().to_string()),
    )
}
