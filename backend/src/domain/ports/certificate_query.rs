//! Driving port for certificate reads.
use async_trait::async_trait;

use crate::domain::{Certificate, CertificateVerification, Error, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateQuery: Send + Sync {
    /// Public verification of a certificate code. Input is normalised before
    /// lookup; malformed codes read as not found.
    async fn verify_certificate(&self, code: &str) -> Result<CertificateVerification, Error>;

    /// Certificates of a user, most recent first.
    async fn list_certificates(&self, user_id: &UserId) -> Result<Vec<Certificate>, Error>;
}

/// Fixture query with no certificates.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCertificateQuery;

#[async_trait]
impl CertificateQuery for FixtureCertificateQuery {
    async fn verify_certificate(&self, _code: &str) -> Result<CertificateVerification, Error> {
        Err(Error::not_found("certificate not found"))
    }

    async fn list_certificates(&self, _user_id: &UserId) -> Result<Vec<Certificate>, Error> {
        Ok(Vec::new())
    }
}
