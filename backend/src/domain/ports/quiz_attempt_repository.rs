//! Port for reading quiz outcomes used by the completion policy.
use async_trait::async_trait;

use crate::domain::{CourseId, FinalQuizStatus, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by quiz attempt repository adapters.
    pub enum QuizAttemptRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "quiz attempt repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "quiz attempt repository query failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Report whether the user passed the course's final quiz, or that the
    /// course has none.
    async fn final_quiz_status(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<FinalQuizStatus, QuizAttemptRepositoryError>;
}

/// Fixture implementation for courses without a final quiz.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureQuizAttemptRepository;

#[async_trait]
impl QuizAttemptRepository for FixtureQuizAttemptRepository {
    async fn final_quiz_status(
        &self,
        _user_id: &UserId,
        _course_id: &CourseId,
    ) -> Result<FinalQuizStatus, QuizAttemptRepositoryError> {
        Ok(FinalQuizStatus::NoFinalQuiz)
    }
}
