//! Logical cache keys and invalidation targets.
//!
//! Write operations never talk to the cache directly. They return the
//! [`CacheInvalidation`] values describing what became stale and the side
//! effect runner applies them.
use thiserror::Error;

use crate::domain::{CourseSlug, UserId};

/// Key under which a cached read model is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Construct a cache key after validating that it is non-empty and trimmed.
    pub fn new(value: impl Into<String>) -> Result<Self, CacheKeyValidationError> {
        let raw = value.into();
        if raw.trim().is_empty() {
            return Err(CacheKeyValidationError::Empty);
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(CacheKeyValidationError::ContainsWhitespace);
        }
        Ok(Self(raw))
    }

    /// Learn-page view of one course for one user.
    pub fn learn_page(course: &CourseSlug, user_id: &UserId) -> Self {
        Self(format!("learn:{course}:{user_id}"))
    }

    /// Certificate list of a user.
    pub fn certificates(user_id: &UserId) -> Self {
        Self(format!("certificates:{user_id}"))
    }

    /// Enrollment list of a user.
    pub fn enrollments(user_id: &UserId) -> Self {
        Self(format!("enrollments:{user_id}"))
    }

    /// Dashboard aggregates of a user.
    pub fn dashboard(user_id: &UserId) -> Self {
        Self(format!("dashboard:{user_id}"))
    }

    /// Prefix covering every course-level aggregate of a course.
    pub fn course_stats_prefix(course: &CourseSlug) -> Self {
        Self(format!("course-stats:{course}:"))
    }

    /// Borrow the underlying key as a string slice.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Validation errors returned when constructing [`CacheKey`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheKeyValidationError {
    /// Key is empty after trimming whitespace.
    #[error("cache key must not be empty")]
    Empty,
    /// Key contains whitespace.
    #[error("cache key must not contain whitespace")]
    ContainsWhitespace,
}

/// Cache entries to drop after a write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheInvalidation {
    /// Delete one key.
    Key(CacheKey),
    /// Delete every key starting with the given prefix.
    Prefix(CacheKey),
}

impl CacheInvalidation {
    /// Keys that go stale whenever a user's progress in a course changes.
    pub fn for_progress_change(course: &CourseSlug, user_id: &UserId) -> Vec<Self> {
        vec![
            Self::Key(CacheKey::learn_page(course, user_id)),
            Self::Key(CacheKey::certificates(user_id)),
            Self::Key(CacheKey::enrollments(user_id)),
            Self::Key(CacheKey::dashboard(user_id)),
        ]
    }
}
