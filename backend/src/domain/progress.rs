//! Enrollment progress primitives.
//!
//! ## Invariants
//! - `progress_percent = min(round_half_up(100 * completed / total), 100)`;
//!   a course without lessons has no percentage at all.
//! - `completed_at` is set once, when the percentage first reaches 100, and
//!   only the administrative reset clears it.
//! - `revision` grows by one with every progress write and guards the
//!   enrollment row with compare-and-swap semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{CourseId, CourseSlug, EnrollmentId, LessonId, ModuleId, UserId};

/// Errors raised while computing progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProgressError {
    /// Percentages are undefined for a course with no lessons.
    #[error("course has no lessons")]
    NoLessons,
}

/// Whole-number completion percentage in `0..=100`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct ProgressPercent(u8);

impl ProgressPercent {
    /// Zero progress.
    pub const ZERO: Self = Self(0);
    /// Full completion.
    pub const FULL: Self = Self(100);

    /// Compute the percentage of `completed` out of `total` lessons.
    ///
    /// Uses integer round-half-up and clamps to 100 so stale counts can
    /// never overshoot.
    ///
    /// # Examples
    /// ```
    /// use backend::domain::ProgressPercent;
    ///
    /// let percent = ProgressPercent::from_counts(1, 3).expect("non-empty course");
    /// assert_eq!(percent.value(), 33);
    /// let percent = ProgressPercent::from_counts(2, 3).expect("non-empty course");
    /// assert_eq!(percent.value(), 67);
    /// ```
    pub fn from_counts(completed: u64, total: u64) -> Result<Self, ProgressError> {
        if total == 0 {
            return Err(ProgressError::NoLessons);
        }
        let rounded = (200 * completed + total) / (2 * total);
        Ok(Self(u8::try_from(rounded.min(100)).unwrap_or(100)))
    }

    /// Clamp a stored value into range.
    pub fn clamped(value: i64) -> Self {
        Self(u8::try_from(value.clamp(0, 100)).unwrap_or(0))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_complete(self) -> bool {
        self.0 >= 100
    }
}

/// Completion state of a single lesson for a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Completed,
}

impl LessonStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
        }
    }
}

/// A recorded lesson completion. Rows are created once and never updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonProgress {
    pub id: Uuid,
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub status: LessonStatus,
    pub completed_at: DateTime<Utc>,
}

/// Insert payload for a lesson completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLessonProgress {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub completed_at: DateTime<Utc>,
}

/// A user's enrollment in a course together with its progress projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub progress_percent: ProgressPercent,
    pub last_accessed_lesson_id: Option<LessonId>,
    pub last_accessed_module_id: Option<ModuleId>,
    pub completed_at: Option<DateTime<Utc>>,
    pub revision: u32,
    pub enrolled_at: DateTime<Utc>,
}

impl Enrollment {
    /// Whether the course has been completed.
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Derive the next state after a lesson completion.
    ///
    /// `completed_at` is stamped with `now` only on the transition to 100;
    /// an existing timestamp is preserved.
    pub fn with_progress(
        &self,
        percent: ProgressPercent,
        lesson_id: LessonId,
        module_id: ModuleId,
        now: DateTime<Utc>,
    ) -> Self {
        let completed_at = match self.completed_at {
            Some(at) => Some(at),
            None if percent.is_complete() => Some(now),
            None => None,
        };
        Self {
            progress_percent: percent,
            last_accessed_lesson_id: Some(lesson_id),
            last_accessed_module_id: Some(module_id),
            completed_at,
            revision: self.revision.saturating_add(1),
            ..self.clone()
        }
    }

    /// Derive the state written by the administrative reset.
    pub fn reset(&self) -> Self {
        Self {
            progress_percent: ProgressPercent::ZERO,
            last_accessed_lesson_id: None,
            last_accessed_module_id: None,
            completed_at: None,
            revision: self.revision.saturating_add(1),
            ..self.clone()
        }
    }
}

/// Learn-page aggregate for one user and course. Cached as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressView {
    pub course_slug: CourseSlug,
    pub course_title: String,
    pub enrollment_id: EnrollmentId,
    pub total_lessons: u32,
    pub completed_lesson_ids: Vec<LessonId>,
    pub progress_percent: ProgressPercent,
    pub last_accessed_lesson_id: Option<LessonId>,
    pub last_accessed_module_id: Option<ModuleId>,
    pub completed_at: Option<DateTime<Utc>>,
}
