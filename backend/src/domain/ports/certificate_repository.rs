//! Port for issued certificates.
//!
//! The store holds two uniqueness constraints: one certificate per enrollment
//! and globally unique codes. Adapters report which one a failed insert hit so
//! the issuer can tell a lost issuance race from a code collision.

use async_trait::async_trait;

use crate::domain::{Certificate, CertificateCode, CertificateId, EnrollmentId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by certificate repository adapters.
    pub enum CertificateRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "certificate repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "certificate repository query failed: {message}",
        /// A certificate already exists for the enrollment.
        DuplicateEnrollment => "certificate already issued for enrollment",
        /// The generated code is already taken.
        DuplicateCode => "certificate code already in use",
    }
}

/// Port for certificate storage and lookup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateRepository: Send + Sync {
    /// Fetch a certificate by id.
    async fn find_by_id(
        &self,
        certificate_id: &CertificateId,
    ) -> Result<Option<Certificate>, CertificateRepositoryError>;

    /// Fetch the certificate issued for an enrollment.
    async fn find_by_enrollment(
        &self,
        enrollment_id: &EnrollmentId,
    ) -> Result<Option<Certificate>, CertificateRepositoryError>;

    /// Fetch a certificate by its public code.
    async fn find_by_code(
        &self,
        code: &CertificateCode,
    ) -> Result<Option<Certificate>, CertificateRepositoryError>;

    /// Whether a code is already in use.
    async fn code_exists(&self, code: &CertificateCode) -> Result<bool, CertificateRepositoryError>;

    /// Insert a newly issued certificate.
    async fn insert(&self, certificate: &Certificate) -> Result<(), CertificateRepositoryError>;

    /// List a user's certificates, most recently issued first.
    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Certificate>, CertificateRepositoryError>;

    /// Point a certificate at a freshly stored document.
    async fn update_document_ref(
        &self,
        certificate_id: &CertificateId,
        document_ref: &str,
    ) -> Result<(), CertificateRepositoryError>;
}

/// Fixture implementation with no certificates.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCertificateRepository;

#[async_trait]
impl CertificateRepository for FixtureCertificateRepository {
    async fn find_by_id(
        &self,
        _certificate_id: &CertificateId,
    ) -> Result<Option<Certificate>, CertificateRepositoryError> {
        Ok(None)
    }

    async fn find_by_enrollment(
        &self,
        _enrollment_id: &EnrollmentId,
    ) -> Result<Option<Certificate>, CertificateRepositoryError> {
        Ok(None)
    }

    async fn find_by_code(
        &self,
        _code: &CertificateCode,
    ) -> Result<Option<Certificate>, CertificateRepositoryError> {
        Ok(None)
    }

    async fn code_exists(
        &self,
        _code: &CertificateCode,
    ) -> Result<bool, CertificateRepositoryError> {
        Ok(false)
    }

    async fn insert(&self, _certificate: &Certificate) -> Result<(), CertificateRepositoryError> {
        Ok(())
    }

    async fn list_for_user(
        &self,
        _user_id: &UserId,
    ) -> Result<Vec<Certificate>, CertificateRepositoryError> {
        Ok(Vec::new())
    }

    async fn update_document_ref(
        &self,
        _certificate_id: &CertificateId,
        _document_ref: &str,
    ) -> Result<(), CertificateRepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_repository_reports_free_codes() {
        let repo = FixtureCertificateRepository;
        let code = CertificateCode::parse("CERT-ABCDEFGHJKLM").expect("valid code");
        assert!(!repo.code_exists(&code).await.expect("fixture lookup"));
        assert!(
            repo.list_for_user(&UserId::random())
                .await
                .expect("fixture list")
                .is_empty()
        );
    }
}
