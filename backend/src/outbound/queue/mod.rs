//! Task dispatcher adapters.
//!
//! [`TokioTaskDispatcher`] runs background side effects as detached Tokio
//! tasks so request handlers return as soon as the authoritative write is
//! done. [`InlineTaskDispatcher`] runs them before returning, which keeps
//! tests deterministic.

use async_trait::async_trait;
use tokio::runtime::Handle;

use crate::domain::ports::{BackgroundTask, TaskDispatchError, TaskDispatcher};

/// Dispatcher spawning each task on the current Tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct TokioTaskDispatcher;

impl TokioTaskDispatcher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskDispatcher for TokioTaskDispatcher {
    async fn dispatch(&self, task: BackgroundTask) -> Result<(), TaskDispatchError> {
        let handle = Handle::try_current()
            .map_err(|err| TaskDispatchError::unavailable(err.to_string()))?;
        let label = task.label;
        handle.spawn(task.run());
        tracing::debug!(effect = label, "background task spawned");
        Ok(())
    }
}

/// Dispatcher awaiting each task before returning.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineTaskDispatcher;

#[async_trait]
impl TaskDispatcher for InlineTaskDispatcher {
    async fn dispatch(&self, task: BackgroundTask) -> Result<(), TaskDispatchError> {
        task.run().await;
        Ok(())
    }
}
