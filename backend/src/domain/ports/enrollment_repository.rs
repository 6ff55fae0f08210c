//! Port for enrollment persistence.
//!
//! Progress writes use optimistic concurrency: callers pass the revision they
//! read and the adapter applies the write only if the stored row still
//! carries it. This serialises concurrent read-count-write cycles on the same
//! enrollment without holding a row lock across the count.

use async_trait::async_trait;

use crate::domain::{CourseId, Enrollment, EnrollmentId, LessonId, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by enrollment repository adapters.
    pub enum EnrollmentRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "enrollment repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "enrollment repository query failed: {message}",
        /// Optimistic concurrency check failed.
        RevisionMismatch { expected: u32, actual: u32 } =>
            "revision mismatch: expected {expected}, found {actual}",
        /// The enrollment disappeared between read and write.
        Missing { enrollment_id: String } =>
            "enrollment {enrollment_id} no longer exists",
    }
}

/// Port for enrollment storage and progress writes.
///
/// # Revision Semantics
///
/// - The caller sets `enrollment.revision` to the new value.
/// - The write succeeds only when the stored revision equals
///   `expected_revision`; otherwise
///   [`EnrollmentRepositoryError::RevisionMismatch`] is returned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Fetch an enrollment by id.
    async fn find_by_id(
        &self,
        enrollment_id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError>;

    /// Fetch the enrollment of a user in a course.
    async fn find_for_user_and_course(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError>;

    /// Write the progress projection of `enrollment` conditioned on the
    /// stored revision.
    async fn save_progress(
        &self,
        enrollment: &Enrollment,
        expected_revision: u32,
    ) -> Result<(), EnrollmentRepositoryError>;

    /// Atomically delete the user's completions for `lesson_ids` and write
    /// the reset enrollment. Returns the number of deleted completion rows.
    async fn reset_progress(
        &self,
        enrollment: &Enrollment,
        lesson_ids: &[LessonId],
    ) -> Result<u64, EnrollmentRepositoryError>;
}

/// Fixture implementation that knows no enrollments and accepts writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureEnrollmentRepository;

#[async_trait]
impl EnrollmentRepository for FixtureEnrollmentRepository {
    async fn find_by_id(
        &self,
        _enrollment_id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        Ok(None)
    }

    async fn find_for_user_and_course(
        &self,
        _user_id: &UserId,
        _course_id: &CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        Ok(None)
    }

    async fn save_progress(
        &self,
        _enrollment: &Enrollment,
        _expected_revision: u32,
    ) -> Result<(), EnrollmentRepositoryError> {
        Ok(())
    }

    async fn reset_progress(
        &self,
        _enrollment: &Enrollment,
        _lesson_ids: &[LessonId],
    ) -> Result<u64, EnrollmentRepositoryError> {
        Ok(0)
    }
}
