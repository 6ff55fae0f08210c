//! Port for lesson completion rows.
//!
//! Rows are insert-only. The store enforces one row per (user, lesson), so a
//! second completion of the same lesson surfaces as
//! [`LessonProgressRepositoryError::Duplicate`] rather than an upsert.

use async_trait::async_trait;

use crate::domain::{LessonId, LessonProgress, NewLessonProgress, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by lesson progress repository adapters.
    pub enum LessonProgressRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "lesson progress repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "lesson progress repository query failed: {message}",
        /// A completion already exists for the user and lesson.
        Duplicate => "lesson already completed",
    }
}

/// Port for recording and counting lesson completions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LessonProgressRepository: Send + Sync {
    /// Insert a completion row and return it as stored.
    async fn insert(
        &self,
        progress: &NewLessonProgress,
    ) -> Result<LessonProgress, LessonProgressRepositoryError>;

    /// Fetch the completion row of a user for a lesson.
    async fn find(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, LessonProgressRepositoryError>;

    /// Count the user's completed lessons among `lesson_ids`.
    async fn count_completed(
        &self,
        user_id: &UserId,
        lesson_ids: &[LessonId],
    ) -> Result<u32, LessonProgressRepositoryError>;

    /// List the ids of the user's completed lessons among `lesson_ids`.
    async fn list_completed(
        &self,
        user_id: &UserId,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<LessonId>, LessonProgressRepositoryError>;
}

/// Fixture implementation that accepts inserts without storing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureLessonProgressRepository;

#[async_trait]
impl LessonProgressRepository for FixtureLessonProgressRepository {
    async fn insert(
        &self,
        progress: &NewLessonProgress,
    ) -> Result<LessonProgress, LessonProgressRepositoryError> {
        Ok(LessonProgress {
            id: uuid::Uuid::new_v4(),
            user_id: progress.user_id,
            lesson_id: progress.lesson_id,
            status: crate::domain::LessonStatus::Completed,
            completed_at: progress.completed_at,
        })
    }

    async fn find(
        &self,
        _user_id: &UserId,
        _lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, LessonProgressRepositoryError> {
        Ok(None)
    }

    async fn count_completed(
        &self,
        _user_id: &UserId,
        _lesson_ids: &[LessonId],
    ) -> Result<u32, LessonProgressRepositoryError> {
        Ok(0)
    }

    async fn list_completed(
        &self,
        _user_id: &UserId,
        _lesson_ids: &[LessonId],
    ) -> Result<Vec<LessonId>, LessonProgressRepositoryError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    #[tokio::test]
    async fn fixture_insert_echoes_payload() {
        let repo = FixtureLessonProgressRepository;
        let payload = NewLessonProgress {
            user_id: UserId::random(),
            lesson_id: LessonId::random(),
            completed_at: Utc::now(),
        };

        let stored = repo.insert(&payload).await.expect("fixture insert");
        assert_eq!(stored.lesson_id, payload.lesson_id);
        assert_eq!(stored.completed_at, payload.completed_at);
    }

    #[rstest]
    fn duplicate_error_reads_as_conflict_message() {
        assert_eq!(
            LessonProgressRepositoryError::duplicate().to_string(),
            "lesson already completed"
        );
    }
}
