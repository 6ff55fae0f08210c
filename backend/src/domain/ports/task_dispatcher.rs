//! Domain port for fire-and-forget background work.
//!
//! Side effects that must not delay or fail the caller are handed to a
//! dispatcher. Tasks report failures as strings; the dispatcher only logs them.
use async_trait::async_trait;
use futures_util::future::BoxFuture;

use super::define_port_error;

define_port_error! {
    /// Errors surfaced by the dispatcher adapter.
    pub enum TaskDispatchError {
        /// The dispatcher cannot accept work.
        Unavailable { message: String } => "task dispatcher is unavailable: {message}",
    }
}

/// A labelled unit of background work.
pub struct BackgroundTask {
    /// Short name used in logs, e.g. `"send_certificate_email"`.
    pub label: &'static str,
    pub future: BoxFuture<'static, Result<(), String>>,
}

impl BackgroundTask {
    pub fn new(
        label: &'static str,
        future: impl Future<Output = Result<(), String>> + Send + 'static,
    ) -> Self {
        Self {
            label,
            future: Box::pin(future),
        }
    }

    /// Drive the task to completion, logging a failure.
    pub async fn run(self) {
        let Self { label, future } = self;
        if let Err(error) = future.await {
            tracing::warn!(effect = label, error = %error, "background task failed");
        }
    }
}

impl std::fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    /// Submit a task without waiting for it to finish.
    async fn dispatch(&self, task: BackgroundTask) -> Result<(), TaskDispatchError>;
}
