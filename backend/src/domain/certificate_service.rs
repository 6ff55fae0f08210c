//! Certificate issuance domain service.
//!
//! Issuance validates the enrollment and the final quiz gate, snapshots the display fields, draws a
//! unique code, renders the document with a bounded timeout, stores it and
//! only then inserts the certificate row. No transaction spans the renderer
//! or storage calls. Email and notification delivery run afterwards through
//! the side-effect runner and never fail issuance.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    CacheInvalidation, CacheKey, CertificateCommand, CertificateQuery, CertificateRepository,
    CertificateRepositoryError, CertificateStorage, CourseRepository, CourseRepositoryError,
    DocumentRenderer, EnrollmentRepository, EnrollmentRepositoryError, ProgressCache,
    QuizAttemptRepository, QuizAttemptRepositoryError, UserDirectory, UserDirectoryError,
};
use crate::domain::side_effects::{SideEffect, SideEffectRunner};
use crate::domain::{
    Certificate, CertificateCode, CertificateDocument, CertificateId, CertificateSnapshot,
    CertificateVerification, CompletionPolicy, Enrollment, EnrollmentId, Error, FinalQuizStatus,
    NewNotification, NotificationKind, OutgoingEmail, UserId, format_long_date,
};

/// Default upper bound on a single render call.
pub const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of codes drawn before issuance gives up.
pub const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 5;

/// Source of candidate certificate codes.
pub trait CertificateCodeSource: Send + Sync {
    fn next_code(&self) -> CertificateCode;
}

/// Draws codes from the thread-local cryptographically seeded generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomCodeSource;

impl CertificateCodeSource for RandomCodeSource {
    fn next_code(&self) -> CertificateCode {
        CertificateCode::generate(&mut rand::thread_rng())
    }
}

/// Replays a fixed list of codes, then falls back to random ones.
#[derive(Debug, Default)]
pub struct FixedCodeSource(Mutex<VecDeque<CertificateCode>>);

impl FixedCodeSource {
    pub fn new(codes: impl IntoIterator<Item = CertificateCode>) -> Self {
        Self(Mutex::new(codes.into_iter().collect()))
    }
}

impl CertificateCodeSource for FixedCodeSource {
    fn next_code(&self) -> CertificateCode {
        let next = match self.0.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        };
        next.unwrap_or_else(|| RandomCodeSource.next_code())
    }
}

/// Driven ports used by the certificate service.
#[derive(Clone)]
pub struct CertificatePorts {
    pub certificates: Arc<dyn CertificateRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub courses: Arc<dyn CourseRepository>,
    pub quiz_attempts: Arc<dyn QuizAttemptRepository>,
    pub users: Arc<dyn UserDirectory>,
    pub renderer: Arc<dyn DocumentRenderer>,
    pub storage: Arc<dyn CertificateStorage>,
    pub cache: Arc<dyn ProgressCache>,
}

/// Tunables of the certificate service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateSettings {
    /// Under [`CompletionPolicy::RequireFinalQuiz`] every issuance path,
    /// including explicit requests, needs a passed final quiz.
    pub completion_policy: CompletionPolicy,
    pub render_timeout: Duration,
    pub max_code_attempts: u32,
    /// Base URL under which stored documents are downloadable.
    pub download_base_url: String,
    pub cache_ttl: Duration,
}

impl Default for CertificateSettings {
    fn default() -> Self {
        Self {
            completion_policy: CompletionPolicy::default(),
            render_timeout: DEFAULT_RENDER_TIMEOUT,
            max_code_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
            download_base_url: "http://localhost:8080/files".to_owned(),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Certificate service implementing [`CertificateCommand`] and
/// [`CertificateQuery`].
#[derive(Clone)]
pub struct CertificateService {
    ports: CertificatePorts,
    codes: Arc<dyn CertificateCodeSource>,
    effects: SideEffectRunner,
    clock: Arc<dyn Clock>,
    settings: CertificateSettings,
}

fn map_certificate_error(error: CertificateRepositoryError) -> Error {
    match error {
        CertificateRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("certificate repository unavailable: {message}"))
        }
        CertificateRepositoryError::Query { message } => {
            Error::internal(format!("certificate repository error: {message}"))
        }
        CertificateRepositoryError::DuplicateEnrollment => {
            Error::conflict("certificate already issued for enrollment")
        }
        CertificateRepositoryError::DuplicateCode => {
            Error::conflict("certificate code collision; retry the request")
        }
    }
}

fn map_enrollment_error(error: EnrollmentRepositoryError) -> Error {
    match error {
        EnrollmentRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("enrollment repository unavailable: {message}"))
        }
        EnrollmentRepositoryError::Missing { enrollment_id } => {
            Error::not_found(format!("enrollment {enrollment_id} not found"))
        }
        other => Error::internal(format!("enrollment repository error: {other}")),
    }
}

fn map_course_error(error: CourseRepositoryError) -> Error {
    match error {
        CourseRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("course repository unavailable: {message}"))
        }
        CourseRepositoryError::Query { message } => {
            Error::internal(format!("course repository error: {message}"))
        }
    }
}

fn map_quiz_error(error: QuizAttemptRepositoryError) -> Error {
    match error {
        QuizAttemptRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("quiz attempt repository unavailable: {message}"))
        }
        QuizAttemptRepositoryError::Query { message } => {
            Error::internal(format!("quiz attempt repository error: {message}"))
        }
    }
}

fn map_user_error(error: UserDirectoryError) -> Error {
    match error {
        UserDirectoryError::Connection { message } => {
            Error::service_unavailable(format!("user directory unavailable: {message}"))
        }
        UserDirectoryError::Query { message } => {
            Error::internal(format!("user directory error: {message}"))
        }
    }
}

/// HTML body of the certificate email.
fn certificate_email_html(snapshot: &CertificateSnapshot, code: &str, download_url: &str) -> String {
    format!(
        "<p>Congratulations {name}!</p>\
         <p>You completed <strong>{course}</strong> on {date}.</p>\
         <p><a href=\"{download_url}\">Download your certificate</a></p>\
         <p>Certificate code: <code>{code}</code></p>",
        name = snapshot.student_name,
        course = snapshot.course_title,
        date = format_long_date(snapshot.completed_at),
    )
}

impl CertificateService {
    /// Create a service over the given ports.
    pub fn new(
        ports: CertificatePorts,
        codes: Arc<dyn CertificateCodeSource>,
        effects: SideEffectRunner,
        clock: Arc<dyn Clock>,
        settings: CertificateSettings,
    ) -> Self {
        Self {
            ports,
            codes,
            effects,
            clock,
            settings,
        }
    }

    fn download_url(&self, code: &CertificateCode) -> String {
        format!(
            "{}/{}",
            self.settings.download_base_url.trim_end_matches('/'),
            code.document_path()
        )
    }

    async fn load_enrollment(&self, enrollment_id: &EnrollmentId) -> Result<Enrollment, Error> {
        self.ports
            .enrollments
            .find_by_id(enrollment_id)
            .await
            .map_err(map_enrollment_error)?
            .ok_or_else(|| Error::not_found(format!("enrollment {enrollment_id} not found")))
    }

    async fn ensure_final_quiz_passed(&self, enrollment: &Enrollment) -> Result<(), Error> {
        if self.settings.completion_policy != CompletionPolicy::RequireFinalQuiz {
            return Ok(());
        }
        let status = self
            .ports
            .quiz_attempts
            .final_quiz_status(&enrollment.user_id, &enrollment.course_id)
            .await
            .map_err(map_quiz_error)?;
        match status {
            FinalQuizStatus::NotPassed => Err(Error::invalid_state("final quiz not passed")),
            FinalQuizStatus::Passed | FinalQuizStatus::NoFinalQuiz => Ok(()),
        }
    }

    async fn snapshot(
        &self,
        enrollment: &Enrollment,
        completed_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<CertificateSnapshot, Error> {
        let profile = self
            .ports
            .users
            .find_profile(&enrollment.user_id)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found(format!("user {} not found", enrollment.user_id)))?;
        let course = self
            .ports
            .courses
            .find_summary_by_id(&enrollment.course_id)
            .await
            .map_err(map_course_error)?
            .ok_or_else(|| {
                Error::not_found(format!("course {} not found", enrollment.course_id))
            })?;
        Ok(CertificateSnapshot {
            student_name: profile.display_name,
            student_email: profile.email,
            course_title: course.title,
            completed_at,
        })
    }

    async fn fresh_code(&self) -> Result<CertificateCode, Error> {
        for attempt in 1..=self.settings.max_code_attempts {
            let code = self.codes.next_code();
            let taken = self
                .ports
                .certificates
                .code_exists(&code)
                .await
                .map_err(map_certificate_error)?;
            if !taken {
                return Ok(code);
            }
            debug!(attempt, "certificate code already taken; drawing another");
        }
        Err(Error::conflict("could not allocate a unique certificate code"))
    }

    /// Render and store the document of `code`, returning its reference.
    async fn produce_document(
        &self,
        code: &CertificateCode,
        snapshot: &CertificateSnapshot,
    ) -> Result<String, Error> {
        let document = CertificateDocument::from_snapshot(code, snapshot);
        let bytes = match tokio::time::timeout(
            self.settings.render_timeout,
            self.ports.renderer.render(&document),
        )
        .await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(error)) => {
                warn!(%code, error = %error, "certificate rendering failed");
                return Err(Error::render_failed("certificate rendering failed"));
            }
            Err(_) => {
                warn!(
                    %code,
                    timeout_secs = self.settings.render_timeout.as_secs(),
                    "certificate rendering timed out"
                );
                return Err(Error::render_failed("certificate rendering timed out"));
            }
        };

        self.ports
            .storage
            .store(&code.document_path(), &bytes)
            .await
            .map_err(|error| {
                warn!(%code, error = %error, "certificate storage failed");
                Error::storage_failed("certificate storage failed")
            })
    }

    fn issuance_effects(&self, certificate: &Certificate) -> Vec<SideEffect> {
        let download_url = self.download_url(&certificate.code);
        let snapshot = &certificate.snapshot;
        vec![
            SideEffect::InvalidateCache(CacheInvalidation::Key(CacheKey::certificates(
                &certificate.user_id,
            ))),
            SideEffect::SendEmail(OutgoingEmail {
                to: snapshot.student_email.clone(),
                subject: format!("Your certificate for {}", snapshot.course_title),
                html: certificate_email_html(snapshot, certificate.code.as_str(), &download_url),
            }),
            SideEffect::Notify(NewNotification {
                recipient_id: certificate.user_id,
                kind: NotificationKind::CertificateIssued,
                content: format!("Your certificate for {} is ready", snapshot.course_title),
                metadata: json!({
                    "certificateId": certificate.id,
                    "certificateCode": certificate.code,
                    "courseId": certificate.course_id,
                    "courseTitle": snapshot.course_title,
                    "downloadUrl": download_url,
                }),
            }),
        ]
    }

    async fn cached_certificates(&self, key: &CacheKey) -> Option<Vec<Certificate>> {
        match self.ports.cache.get(key).await {
            Ok(Some(raw)) => serde_json::from_str(&raw)
                .inspect_err(|error| warn!(%key, error = %error, "discarding cached certificates"))
                .ok(),
            Ok(None) => None,
            Err(error) => {
                warn!(%key, error = %error, "certificate cache read failed; using store");
                None
            }
        }
    }
}

#[async_trait]
impl CertificateCommand for CertificateService {
    async fn issue_certificate(
        &self,
        user_id: &UserId,
        enrollment_id: &EnrollmentId,
    ) -> Result<Certificate, Error> {
        let enrollment = self.load_enrollment(enrollment_id).await?;
        if enrollment.user_id != *user_id {
            return Err(Error::forbidden("enrollment belongs to another user"));
        }
        let Some(completed_at) = enrollment.completed_at else {
            return Err(Error::invalid_state("course not completed"));
        };

        if let Some(existing) = self
            .ports
            .certificates
            .find_by_enrollment(enrollment_id)
            .await
            .map_err(map_certificate_error)?
        {
            debug!(%enrollment_id, certificate_id = %existing.id, "certificate already issued");
            return Ok(existing);
        }

        self.ensure_final_quiz_passed(&enrollment).await?;
        let snapshot = self.snapshot(&enrollment, completed_at).await?;
        let code = self.fresh_code().await?;
        let document_ref = self.produce_document(&code, &snapshot).await?;

        let certificate = Certificate {
            id: CertificateId::random(),
            enrollment_id: enrollment.id,
            user_id: enrollment.user_id,
            course_id: enrollment.course_id,
            code,
            document_ref,
            snapshot,
            issued_at: self.clock.utc(),
        };
        match self.ports.certificates.insert(&certificate).await {
            Ok(()) => {}
            Err(CertificateRepositoryError::DuplicateEnrollment) => {
                let winner = self
                    .ports
                    .certificates
                    .find_by_enrollment(enrollment_id)
                    .await
                    .map_err(map_certificate_error)?;
                return winner.ok_or_else(|| {
                    Error::conflict("certificate issuance raced with another request")
                });
            }
            Err(other) => return Err(map_certificate_error(other)),
        }

        info!(
            certificate_id = %certificate.id,
            code = %certificate.code,
            %enrollment_id,
            "certificate issued"
        );
        self.effects.run(self.issuance_effects(&certificate)).await;
        Ok(certificate)
    }

    async fn regenerate_certificate(
        &self,
        certificate_id: &CertificateId,
    ) -> Result<Certificate, Error> {
        let mut certificate = self
            .ports
            .certificates
            .find_by_id(certificate_id)
            .await
            .map_err(map_certificate_error)?
            .ok_or_else(|| Error::not_found(format!("certificate {certificate_id} not found")))?;

        let document_ref = self
            .produce_document(&certificate.code, &certificate.snapshot)
            .await?;
        self.ports
            .certificates
            .update_document_ref(certificate_id, &document_ref)
            .await
            .map_err(map_certificate_error)?;
        certificate.document_ref = document_ref;

        info!(%certificate_id, code = %certificate.code, "certificate regenerated");
        self.effects
            .run(vec![SideEffect::InvalidateCache(CacheInvalidation::Key(
                CacheKey::certificates(&certificate.user_id),
            ))])
            .await;
        Ok(certificate)
    }
}

#[async_trait]
impl CertificateQuery for CertificateService {
    async fn verify_certificate(&self, code: &str) -> Result<CertificateVerification, Error> {
        let not_found = || Error::not_found("certificate not found");
        let code = CertificateCode::parse(code).map_err(|_| not_found())?;
        let certificate = self
            .ports
            .certificates
            .find_by_code(&code)
            .await
            .map_err(map_certificate_error)?
            .ok_or_else(not_found)?;
        Ok(CertificateVerification::from(&certificate))
    }

    async fn list_certificates(&self, user_id: &UserId) -> Result<Vec<Certificate>, Error> {
        let key = CacheKey::certificates(user_id);
        if let Some(certificates) = self.cached_certificates(&key).await {
            return Ok(certificates);
        }

        let certificates = self
            .ports
            .certificates
            .list_for_user(user_id)
            .await
            .map_err(map_certificate_error)?;
        match serde_json::to_string(&certificates) {
            Ok(payload) => {
                if let Err(error) = self
                    .ports
                    .cache
                    .set(&key, &payload, self.settings.cache_ttl)
                    .await
                {
                    warn!(%key, error = %error, "certificate cache write failed");
                }
            }
            Err(error) => warn!(%key, error = %error, "failed to encode certificates for cache"),
        }
        Ok(certificates)
    }
}

#[cfg(test)]
#[path = "certificate_service_tests.rs"]
mod tests;
