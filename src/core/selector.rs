//! Candidate selection for doctors and beds.
//!
//! Selection is a read-only proposal. A proposal may already be stale when the
//! allocation manager tries to claim it; the conditional claim decides.

use crate::core::model::{BedRef, DoctorId, DoctorLoad};
use crate::core::store::StoreTransaction;
use crate::core::AllocationError;

/// Least-loaded doctor among the given rows.
///
/// Ties keep the order the store returned the rows in.
#[must_use]
pub fn pick_doctor(loads: &[DoctorLoad]) -> Option<DoctorId> {
    // min_by_key returns the first minimum, so store order breaks ties.
    loads
        .iter()
        .min_by_key(|load| load.open_visits)
        .map(|load| load.doctor_id)
}

/// First free bed by `(room_id, bed_id)`.
#[must_use]
pub fn pick_bed(free: &[BedRef]) -> Option<BedRef> {
    free.iter().min().copied()
}

/// Propose a doctor using the transaction's current view.
///
/// # Errors
/// Propagates store failures.
pub fn select_doctor(
    tx: &mut (dyn StoreTransaction + '_),
) -> Result<Option<DoctorId>, AllocationError> {
    let loads = tx.doctor_loads()?;
    let candidate = pick_doctor(&loads);
    tracing::debug!(eligible = loads.len(), ?candidate, "doctor proposal");
    Ok(candidate)
}

/// Propose a bed using the transaction's current view.
///
/// # Errors
/// Propagates store failures.
pub fn select_bed(tx: &mut (dyn StoreTransaction + '_)) -> Result<Option<BedRef>, AllocationError> {
    let free = tx.free_beds()?;
    let candidate = pick_bed(&free);
    tracing::debug!(free = free.len(), ?candidate, "bed proposal");
    Ok(candidate)
}
