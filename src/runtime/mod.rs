//! Runtime adapters and API surface.

pub mod api;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_allocator;

pub use api::{
    close_visit, health, list_open_visits, open_visit, CloseVisitPayload, CloseVisitResponse,
    ErrorResponse, Health, OpenVisitPayload,
};
#[cfg(feature = "tokio-runtime")]
pub use tokio_allocator::{TokioAllocator, VisitService};
