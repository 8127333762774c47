//! Allocation core: domain model, store contract, selector and transaction manager.

pub mod allocation;
pub mod audit;
pub mod error;
pub mod model;
pub mod selector;
pub mod store;

pub use allocation::AllocationManager;
pub use audit::{
    build_audit_event, AllocationEvent, AuditAction, AuditSink, InMemoryAuditSink,
    TracingAuditSink,
};
pub use error::{AllocationError, AppResult};
pub use model::{
    format_folio, Assignment, Bed, BedId, BedRef, BedStatus, Doctor, DoctorId, DoctorLoad,
    NewVisit, OpenVisitRequest, OpenVisitSummary, PatientId, RoomId, Visit, VisitStatus,
    WorkerId, DEFAULT_PRIORITY,
};
pub use selector::{pick_bed, pick_doctor, select_bed, select_doctor};
pub use store::{AllocationStore, StoreTransaction};
