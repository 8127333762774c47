//! In-memory store with undo-log rollback.
//!
//! Tables live behind one `parking_lot::Mutex`. In [`LockMode::Immediate`] a
//! transaction holds the lock from `begin` to commit/rollback, serializing
//! writers. In [`LockMode::PerStatement`] reads lock per statement, so two
//! transactions may both read the same candidate before either claims it.
//! The first write takes the lock and keeps it until commit or rollback, so
//! the undo log never replays over another transaction's committed write.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};

use crate::config::LockMode;
use crate::core::model::{
    format_folio, Bed, BedRef, BedStatus, Doctor, DoctorId, DoctorLoad, NewVisit,
    OpenVisitSummary, Visit, VisitStatus,
};
use crate::core::{AllocationError, AllocationStore, StoreTransaction};

#[derive(Debug, Default)]
struct Tables {
    doctors: BTreeMap<DoctorId, Doctor>,
    beds: BTreeMap<BedRef, BedStatus>,
    /// Insertion order doubles as identity order.
    visits: Vec<Visit>,
    last_visit_id: i64,
}

impl Tables {
    fn visit_mut(&mut self, folio: &str) -> Option<&mut Visit> {
        self.visits.iter_mut().find(|v| v.folio == folio)
    }

    fn set_doctor_available(&mut self, id: DoctorId, available: bool) -> Option<bool> {
        self.doctors
            .get_mut(&id)
            .map(|d| std::mem::replace(&mut d.available, available))
    }

    fn set_bed_status(&mut self, bed: BedRef, status: BedStatus) -> Option<BedStatus> {
        self.beds.get_mut(&bed).map(|s| std::mem::replace(s, status))
    }

    fn apply(&mut self, undo: Undo) {
        match undo {
            Undo::DoctorAvailable { id, previous } => {
                self.set_doctor_available(id, previous);
            }
            Undo::BedStatus { bed, previous } => {
                self.set_bed_status(bed, previous);
            }
            Undo::VisitInserted { folio } => {
                self.visits.retain(|v| v.folio != folio);
            }
            Undo::VisitClosed { folio, previous, closed_at } => {
                if let Some(visit) = self.visit_mut(&folio) {
                    visit.status = previous;
                    visit.closed_at = closed_at;
                }
            }
        }
    }
}

/// Inverse of one write, replayed on rollback.
#[derive(Debug)]
enum Undo {
    DoctorAvailable { id: DoctorId, previous: bool },
    BedStatus { bed: BedRef, previous: BedStatus },
    VisitInserted { folio: String },
    VisitClosed {
        folio: String,
        previous: VisitStatus,
        closed_at: Option<DateTime<Utc>>,
    },
}

/// In-memory doctor/bed/visit store. Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
    lock_mode: LockMode,
}

impl InMemoryStore {
    /// Create an empty store using [`LockMode::Immediate`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with the given lock mode.
    #[must_use]
    pub fn with_lock_mode(lock_mode: LockMode) -> Self {
        Self {
            tables: Arc::default(),
            lock_mode,
        }
    }

    /// Configured lock mode.
    #[must_use]
    pub const fn lock_mode(&self) -> LockMode {
        self.lock_mode
    }

    /// Add or replace a doctor row.
    ///
    /// Provisioning helpers take the table lock; do not call them on a thread
    /// whose open transaction holds it (immediate mode, or after a write).
    pub fn insert_doctor(&self, doctor: Doctor) {
        self.tables.lock().doctors.insert(doctor.id, doctor);
    }

    /// Add an active, available doctor.
    pub fn add_doctor(&self, id: DoctorId) {
        self.insert_doctor(Doctor {
            id,
            active: true,
            available: true,
        });
    }

    /// Add or replace a bed row.
    pub fn insert_bed(&self, bed: Bed) {
        self.tables.lock().beds.insert(bed.location, bed.status);
    }

    /// Add a free bed.
    pub fn add_bed(&self, location: BedRef) {
        self.insert_bed(Bed {
            location,
            status: BedStatus::Free,
        });
    }

    /// Doctor row by id.
    #[must_use]
    pub fn doctor(&self, id: DoctorId) -> Option<Doctor> {
        self.tables.lock().doctors.get(&id).cloned()
    }

    /// All doctor rows in id order.
    #[must_use]
    pub fn doctors(&self) -> Vec<Doctor> {
        self.tables.lock().doctors.values().cloned().collect()
    }

    /// Bed row by location.
    #[must_use]
    pub fn bed(&self, location: BedRef) -> Option<Bed> {
        self.tables
            .lock()
            .beds
            .get(&location)
            .map(|&status| Bed { location, status })
    }

    /// All bed rows ordered by room, then bed.
    #[must_use]
    pub fn beds(&self) -> Vec<Bed> {
        self.tables
            .lock()
            .beds
            .iter()
            .map(|(&location, &status)| Bed { location, status })
            .collect()
    }

    /// Visit by folio.
    #[must_use]
    pub fn visit(&self, folio: &str) -> Option<Visit> {
        self.tables
            .lock()
            .visits
            .iter()
            .find(|v| v.folio == folio)
            .cloned()
    }

    /// All visits in creation order.
    #[must_use]
    pub fn visits(&self) -> Vec<Visit> {
        self.tables.lock().visits.clone()
    }
}

impl AllocationStore for InMemoryStore {
    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>, AllocationError> {
        let guard = match self.lock_mode {
            LockMode::Immediate => Some(self.tables.lock()),
            LockMode::PerStatement => None,
        };
        Ok(Box::new(InMemoryTransaction {
            tables: &self.tables,
            guard,
            undo: Vec::new(),
            finished: false,
        }))
    }

    fn list_open_visits(&self) -> Result<Vec<OpenVisitSummary>, AllocationError> {
        let tables = self.tables.lock();
        // Newest insert first, then a stable sort keeps that order for equal timestamps.
        let mut open: Vec<&Visit> = tables
            .visits
            .iter()
            .rev()
            .filter(|v| v.status == VisitStatus::Open)
            .collect();
        open.sort_by(|a, b| b.opened_at.cmp(&a.opened_at));
        Ok(open.into_iter().map(OpenVisitSummary::from).collect())
    }
}

/// Transaction over [`InMemoryStore`].
pub struct InMemoryTransaction<'a> {
    tables: &'a Mutex<Tables>,
    guard: Option<MutexGuard<'a, Tables>>,
    undo: Vec<Undo>,
    finished: bool,
}

impl InMemoryTransaction<'_> {
    fn with_tables<R>(&mut self, f: impl FnOnce(&mut Tables) -> R) -> R {
        match self.guard.as_mut() {
            Some(guard) => f(&mut **guard),
            None => f(&mut *self.tables.lock()),
        }
    }

    /// Run a write under the transaction's own guard, taking it on first use.
    fn write<R>(&mut self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let tables = self.tables;
        let guard = self.guard.get_or_insert_with(|| tables.lock());
        f(&mut **guard)
    }

    fn undo_all(&mut self) {
        let undo = std::mem::take(&mut self.undo);
        if undo.is_empty() {
            self.finished = true;
            return;
        }
        self.write(|tables| {
            for entry in undo.into_iter().rev() {
                tables.apply(entry);
            }
        });
        self.finished = true;
    }
}

impl Drop for InMemoryTransaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.undo_all();
        }
    }
}

impl StoreTransaction for InMemoryTransaction<'_> {
    fn doctor_loads(&mut self) -> Result<Vec<DoctorLoad>, AllocationError> {
        Ok(self.with_tables(|tables| {
            let mut open_counts: HashMap<DoctorId, u32> = HashMap::new();
            for visit in tables.visits.iter().filter(|v| v.status == VisitStatus::Open) {
                *open_counts.entry(visit.doctor_id).or_default() += 1;
            }
            tables
                .doctors
                .values()
                .filter(|d| d.active && d.available)
                .map(|d| DoctorLoad {
                    doctor_id: d.id,
                    open_visits: open_counts.get(&d.id).copied().unwrap_or(0),
                })
                .collect()
        }))
    }

    fn free_beds(&mut self) -> Result<Vec<BedRef>, AllocationError> {
        Ok(self.with_tables(|tables| {
            tables
                .beds
                .iter()
                .filter(|(_, status)| **status == BedStatus::Free)
                .map(|(bed, _)| *bed)
                .collect()
        }))
    }

    fn visit(&mut self, folio: &str) -> Result<Option<Visit>, AllocationError> {
        Ok(self.with_tables(|tables| tables.visits.iter().find(|v| v.folio == folio).cloned()))
    }

    fn claim_doctor(&mut self, doctor_id: DoctorId) -> Result<usize, AllocationError> {
        let claimed = self.write(|tables| match tables.doctors.get_mut(&doctor_id) {
            Some(doctor) if doctor.available => {
                doctor.available = false;
                true
            }
            _ => false,
        });
        if claimed {
            self.undo.push(Undo::DoctorAvailable {
                id: doctor_id,
                previous: true,
            });
        }
        Ok(usize::from(claimed))
    }

    fn release_doctor(&mut self, doctor_id: DoctorId) -> Result<usize, AllocationError> {
        let previous = self.write(|tables| tables.set_doctor_available(doctor_id, true));
        Ok(previous.map_or(0, |previous| {
            self.undo.push(Undo::DoctorAvailable {
                id: doctor_id,
                previous,
            });
            1
        }))
    }

    fn claim_bed(&mut self, bed: BedRef) -> Result<usize, AllocationError> {
        let claimed = self.write(|tables| match tables.beds.get_mut(&bed) {
            Some(status) if *status == BedStatus::Free => {
                *status = BedStatus::Occupied;
                true
            }
            _ => false,
        });
        if claimed {
            self.undo.push(Undo::BedStatus {
                bed,
                previous: BedStatus::Free,
            });
        }
        Ok(usize::from(claimed))
    }

    fn release_bed(&mut self, bed: BedRef) -> Result<usize, AllocationError> {
        let previous = self.write(|tables| tables.set_bed_status(bed, BedStatus::Free));
        Ok(previous.map_or(0, |previous| {
            self.undo.push(Undo::BedStatus { bed, previous });
            1
        }))
    }

    fn insert_visit(&mut self, visit: &NewVisit) -> Result<String, AllocationError> {
        let folio = self.write(|tables| {
            tables.last_visit_id += 1;
            let folio = format_folio(tables.last_visit_id);
            tables.visits.push(Visit {
                folio: folio.clone(),
                patient_id: visit.patient_id,
                doctor_id: visit.doctor_id,
                worker_id: visit.worker_id,
                room_id: visit.bed.room_id,
                bed_id: visit.bed.bed_id,
                origin: visit.origin.clone(),
                priority: visit.priority,
                reason: visit.reason.clone(),
                opened_at: visit.opened_at,
                closed_at: None,
                status: VisitStatus::Open,
            });
            folio
        });
        self.undo.push(Undo::VisitInserted {
            folio: folio.clone(),
        });
        Ok(folio)
    }

    fn close_visit(
        &mut self,
        folio: &str,
        closed_at: DateTime<Utc>,
    ) -> Result<usize, AllocationError> {
        let previous = self.write(|tables| {
            tables
                .visit_mut(folio)
                .filter(|v| v.status == VisitStatus::Open)
                .map(|v| {
                    let previous_closed_at = v.closed_at.replace(closed_at);
                    v.status = VisitStatus::Closed;
                    previous_closed_at
                })
        });
        Ok(previous.map_or(0, |previous_closed_at| {
            self.undo.push(Undo::VisitClosed {
                folio: folio.to_string(),
                previous: VisitStatus::Open,
                closed_at: previous_closed_at,
            });
            1
        }))
    }

    fn commit(mut self: Box<Self>) -> Result<(), AllocationError> {
        self.undo.clear();
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<(), AllocationError> {
        self.undo_all();
        Ok(())
    }
}
