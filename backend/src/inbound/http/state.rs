//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    CertificateCommand, CertificateQuery, FixtureCertificateCommand, FixtureCertificateQuery,
    FixtureProgressCommand, FixtureProgressQuery, ProgressCommand, ProgressQuery,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub progress: Arc<dyn ProgressCommand>,
    pub progress_query: Arc<dyn ProgressQuery>,
    pub certificates: Arc<dyn CertificateCommand>,
    pub certificates_query: Arc<dyn CertificateQuery>,
}

impl HttpState {
    /// Construct state from the driving ports.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use backend::domain::ports::{
    ///     FixtureCertificateCommand, FixtureCertificateQuery, FixtureProgressCommand,
    ///     FixtureProgressQuery,
    /// };
    /// use backend::inbound::http::state::HttpState;
    ///
    /// let state = HttpState::new(
    ///     Arc::new(FixtureProgressCommand),
    ///     Arc::new(FixtureProgressQuery),
    ///     Arc::new(FixtureCertificateCommand),
    ///     Arc::new(FixtureCertificateQuery),
    /// );
    /// let _ = state.progress.clone();
    /// ```
    pub fn new(
        progress: Arc<dyn ProgressCommand>,
        progress_query: Arc<dyn ProgressQuery>,
        certificates: Arc<dyn CertificateCommand>,
        certificates_query: Arc<dyn CertificateQuery>,
    ) -> Self {
        Self {
            progress,
            progress_query,
            certificates,
            certificates_query,
        }
    }

    /// State backed by one service implementing both progress ports and one
    /// implementing both certificate ports.
    pub fn from_services<P, C>(progress: Arc<P>, certificates: Arc<C>) -> Self
    where
        P: ProgressCommand + ProgressQuery + 'static,
        C: CertificateCommand + CertificateQuery + 'static,
    {
        Self {
            progress: progress.clone(),
            progress_query: progress,
            certificates: certificates.clone(),
            certificates_query: certificates,
        }
    }
}

impl Default for HttpState {
    /// Fixture-backed state for tests and docs.
    fn default() -> Self {
        Self::new(
            Arc::new(FixtureProgressCommand),
            Arc::new(FixtureProgressQuery),
            Arc::new(FixtureCertificateCommand),
            Arc::new(FixtureCertificateQuery),
        )
    }
}
