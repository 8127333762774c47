//! Tokio adapter: runs each allocation transaction on the blocking pool.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::{
    AllocationError, AllocationManager, AllocationStore, Assignment, OpenVisitRequest,
    OpenVisitSummary,
};

/// Async entry points used by an intake layer.
#[async_trait]
pub trait VisitService: Send + Sync {
    /// Open a visit, claiming a doctor and a bed.
    async fn open_visit(&self, request: OpenVisitRequest) -> Result<Assignment, AllocationError>;

    /// Close a visit, releasing its doctor and bed.
    async fn close_visit(&self, folio: String) -> Result<(), AllocationError>;

    /// OPEN visits, newest first.
    async fn list_open_visits(&self) -> Result<Vec<OpenVisitSummary>, AllocationError>;
}

/// Runs [`AllocationManager`] calls on a tokio runtime's blocking pool.
pub struct TokioAllocator<S> {
    manager: Arc<AllocationManager<S>>,
    handle: tokio::runtime::Handle,
}

impl<S> Clone for TokioAllocator<S> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            handle: self.handle.clone(),
        }
    }
}

impl<S> TokioAllocator<S>
where
    S: AllocationStore + 'static,
{
    /// Create an adapter from a runtime handle.
    pub fn new(manager: Arc<AllocationManager<S>>, handle: tokio::runtime::Handle) -> Self {
        Self { manager, handle }
    }

    /// Create an adapter on the runtime the caller is running in.
    ///
    /// # Errors
    /// Returns [`AllocationError::StoreUnavailable`] outside a tokio runtime.
    pub fn try_current(manager: Arc<AllocationManager<S>>) -> Result<Self, AllocationError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| AllocationError::StoreUnavailable(format!("no tokio runtime: {e}")))?;
        Ok(Self::new(manager, handle))
    }

    /// Shared manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<AllocationManager<S>> {
        &self.manager
    }

    async fn run<R, F>(&self, f: F) -> Result<R, AllocationError>
    where
        R: Send + 'static,
        F: FnOnce(&AllocationManager<S>) -> Result<R, AllocationError> + Send + 'static,
    {
        let manager = Arc::clone(&self.manager);
        self.handle
            .spawn_blocking(move || f(&manager))
            .await
            .map_err(|e| AllocationError::StoreUnavailable(format!("blocking task failed: {e}")))?
    }
}

#[async_trait]
impl<S> VisitService for TokioAllocator<S>
where
    S: AllocationStore + 'static,
{
    async fn open_visit(&self, request: OpenVisitRequest) -> Result<Assignment, AllocationError> {
        self.run(move |manager| manager.open_visit(&request)).await
    }

    async fn close_visit(&self, folio: String) -> Result<(), AllocationError> {
        self.run(move |manager| manager.close_visit(&folio)).await
    }

    async fn list_open_visits(&self) -> Result<Vec<OpenVisitSummary>, AllocationError> {
        self.run(|manager| manager.list_open_visits()).await
    }
}
