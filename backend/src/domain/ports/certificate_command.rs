//! Driving port for certificate issuance.
//!
//! The side-effect runner also drives this port when a completion triggers
//! automatic issuance, so implementations must be idempotent per enrollment.

use async_trait::async_trait;

use crate::domain::{Certificate, CertificateId, EnrollmentId, Error, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateCommand: Send + Sync {
    /// Issue the certificate of a completed enrollment owned by `user_id`.
    ///
    /// Returns the existing certificate when one was already issued.
    async fn issue_certificate(
        &self,
        user_id: &UserId,
        enrollment_id: &EnrollmentId,
    ) -> Result<Certificate, Error>;

    /// Re-render a certificate from its stored snapshot.
    async fn regenerate_certificate(
        &self,
        certificate_id: &CertificateId,
    ) -> Result<Certificate, Error>;
}

/// Fixture command that refuses issuance as if no course were complete.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCertificateCommand;

#[async_trait]
impl CertificateCommand for FixtureCertificateCommand {
    async fn issue_certificate(
        &self,
        _user_id: &UserId,
        enrollment_id: &EnrollmentId,
    ) -> Result<Certificate, Error> {
        Err(Error::not_found(format!(
            "enrollment {enrollment_id} not found"
        )))
    }

    async fn regenerate_certificate(
        &self,
        certificate_id: &CertificateId,
    ) -> Result<Certificate, Error> {
        Err(Error::not_found(format!(
            "certificate {certificate_id} not found"
        )))
    }
}
