//! Driving port for the learn-page progress view.
use async_trait::async_trait;

use crate::domain::{CourseProgressView, CourseSlug, Error, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressQuery: Send + Sync {
    /// Progress of a user in a course, served from cache when fresh.
    async fn course_progress(
        &self,
        user_id: &UserId,
        course_slug: &CourseSlug,
    ) -> Result<CourseProgressView, Error>;
}

/// Fixture query that reports every course as unknown.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProgressQuery;

#[async_trait]
impl ProgressQuery for FixtureProgressQuery {
    async fn course_progress(
        &self,
        _user_id: &UserId,
        course_slug: &CourseSlug,
    ) -> Result<CourseProgressView, Error> {
        Err(Error::not_found(format!("course {course_slug} not found")))
    }
}
