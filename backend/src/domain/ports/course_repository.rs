//! Port for read access to the course catalogue.
//!
//! The progress pipeline never edits courses. It needs the ordered outline of
//! a course to count lessons and to resolve which module a lesson lives in.

use async_trait::async_trait;

use crate::domain::{CourseId, CourseOutline, CourseSlug, CourseSummary, LessonContext, LessonId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by course repository adapters.
    pub enum CourseRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "course repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "course repository query failed: {message}",
    }
}

/// Read-only port over courses, modules and lessons.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Resolve a lesson together with its module and the full outline of the
    /// owning course. Returns `None` when the lesson does not exist.
    async fn find_lesson_context(
        &self,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonContext>, CourseRepositoryError>;

    /// Load the ordered outline of a course by slug.
    async fn find_outline_by_slug(
        &self,
        slug: &CourseSlug,
    ) -> Result<Option<CourseOutline>, CourseRepositoryError>;

    /// Load summary fields of a course by id.
    async fn find_summary_by_id(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<CourseSummary>, CourseRepositoryError>;
}

/// Fixture implementation with an empty catalogue.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureCourseRepository;

#[async_trait]
impl CourseRepository for FixtureCourseRepository {
    async fn find_lesson_context(
        &self,
        _lesson_id: &LessonId,
    ) -> Result<Option<LessonContext>, CourseRepositoryError> {
        Ok(None)
    }

    async fn find_outline_by_slug(
        &self,
        _slug: &CourseSlug,
    ) -> Result<Option<CourseOutline>, CourseRepositoryError> {
        Ok(None)
    }

    async fn find_summary_by_id(
        &self,
        _course_id: &CourseId,
    ) -> Result<Option<CourseSummary>, CourseRepositoryError> {
        Ok(None)
    }
}
