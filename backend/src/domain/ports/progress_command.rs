//! Driving port for progress writes.
//!
//! Inbound adapters call [`ProgressCommand`] to record lesson completions and
//! to reset a learner's progress. Implementations own the compare-and-swap
//! write, completion detection and the follow-up side effects.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Actor, CourseSlug, Enrollment, Error, LessonId, LessonProgress, LessonStatus, UserId,
};

/// Request to mark a lesson complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLessonCompletionRequest {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    /// When present the lesson must belong to this course.
    pub course_slug: Option<CourseSlug>,
    /// Client-supplied completion time; defaults to the server clock.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Result of a recorded completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonCompletionOutcome {
    /// The stored completion row.
    pub progress: LessonProgress,
    /// Enrollment state written by this completion.
    pub enrollment: Enrollment,
    /// Whether this completion moved the course to 100 percent.
    pub course_completed: bool,
}

/// Request to clear a learner's progress in a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetCourseProgressRequest {
    /// Who asked for the reset; must be an admin or the course instructor.
    pub actor: Actor,
    pub user_id: UserId,
    pub course_slug: CourseSlug,
}

/// Result of a reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetCourseProgressOutcome {
    pub enrollment: Enrollment,
    /// Number of lesson completions removed.
    pub deleted_lessons: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProgressCommand: Send + Sync {
    /// Record a lesson completion and recompute enrollment progress.
    ///
    /// # Errors
    ///
    /// - `not_found` when the lesson, the course or the enrollment is missing.
    /// - `conflict` when the lesson was already completed.
    /// - `invalid_state` when the course has no lessons.
    /// - `service_unavailable` when concurrent writers keep winning.
    async fn record_lesson_completion(
        &self,
        request: RecordLessonCompletionRequest,
    ) -> Result<LessonCompletionOutcome, Error>;

    /// Delete a learner's completions in a course and zero the enrollment.
    async fn reset_course_progress(
        &self,
        request: ResetCourseProgressRequest,
    ) -> Result<ResetCourseProgressOutcome, Error>;
}

/// Fixture command that accepts every completion without persisting it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureProgressCommand;

#[async_trait]
impl ProgressCommand for FixtureProgressCommand {
    async fn record_lesson_completion(
        &self,
        request: RecordLessonCompletionRequest,
    ) -> Result<LessonCompletionOutcome, Error> {
        let now = request.completed_at.unwrap_or_else(Utc::now);
        let enrollment = fixture_enrollment(request.user_id, now);
        Ok(LessonCompletionOutcome {
            progress: LessonProgress {
                id: uuid::Uuid::new_v4(),
                user_id: request.user_id,
                lesson_id: request.lesson_id,
                status: LessonStatus::Completed,
                completed_at: now,
            },
            enrollment,
            course_completed: false,
        })
    }

    async fn reset_course_progress(
        &self,
        request: ResetCourseProgressRequest,
    ) -> Result<ResetCourseProgressOutcome, Error> {
        Ok(ResetCourseProgressOutcome {
            enrollment: fixture_enrollment(request.user_id, Utc::now()),
            deleted_lessons: 0,
        })
    }
}

fn fixture_enrollment(user_id: UserId, now: DateTime<Utc>) -> Enrollment {
    Enrollment {
        id: crate::domain::EnrollmentId::random(),
        user_id,
        course_id: crate::domain::CourseId::random(),
        progress_percent: crate::domain::ProgressPercent::ZERO,
        last_accessed_lesson_id: None,
        last_accessed_module_id: None,
        completed_at: None,
        revision: 1,
        enrolled_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_command_echoes_lesson() {
        let lesson_id = LessonId::random();
        let outcome = FixtureProgressCommand
            .record_lesson_completion(RecordLessonCompletionRequest {
                user_id: UserId::random(),
                lesson_id,
                course_slug: None,
                completed_at: None,
            })
            .await
            .expect("fixture completion");
        assert_eq!(outcome.progress.lesson_id, lesson_id);
        assert!(!outcome.course_completed);
    }
}
