//! PostgreSQL-backed `QuizAttemptRepository` implementation.
//!
//! Only the course's final quiz matters here. A course has at most one quiz
//! flagged `is_final`, enforced by a partial unique index.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{QuizAttemptRepository, QuizAttemptRepositoryError};
use crate::domain::{CourseId, FinalQuizStatus, UserId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::pool::{DbPool, PoolError};
use super::schema::{quiz_attempts, quizzes};

/// Diesel-backed implementation of the quiz attempt read port.
#[derive(Clone)]
pub struct DieselQuizAttemptRepository {
    pool: DbPool,
}

impl DieselQuizAttemptRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> QuizAttemptRepositoryError {
    map_basic_pool_error(error, |message| {
        QuizAttemptRepositoryError::connection(message)
    })
}

fn map_diesel_error(error: diesel::result::Error) -> QuizAttemptRepositoryError {
    map_basic_diesel_error(
        error,
        QuizAttemptRepositoryError::query,
        QuizAttemptRepositoryError::connection,
    )
}

fn final_quiz_status(final_quiz: Option<Uuid>, passed: bool) -> FinalQuizStatus {
    match (final_quiz, passed) {
        (None, _) => FinalQuizStatus::NoFinalQuiz,
        (Some(_), true) => FinalQuizStatus::Passed,
        (Some(_), false) => FinalQuizStatus::NotPassed,
    }
}

#[async_trait]
impl QuizAttemptRepository for DieselQuizAttemptRepository {
    async fn final_quiz_status(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<FinalQuizStatus, QuizAttemptRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let final_quiz: Option<Uuid> = quizzes::table
            .filter(
                quizzes::course_id
                    .eq(course_id.as_uuid())
                    .and(quizzes::is_final.eq(true)),
            )
            .select(quizzes::id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        let Some(quiz_id) = final_quiz else {
            return Ok(FinalQuizStatus::NoFinalQuiz);
        };

        let passed: bool = diesel::select(diesel::dsl::exists(
            quiz_attempts::table.filter(
                quiz_attempts::quiz_id
                    .eq(quiz_id)
                    .and(quiz_attempts::user_id.eq(user_id.as_uuid()))
                    .and(quiz_attempts::passed.eq(true)),
            ),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)?;

        Ok(final_quiz_status(Some(quiz_id), passed))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, true, FinalQuizStatus::NoFinalQuiz)]
    #[case(Some(Uuid::nil()), true, FinalQuizStatus::Passed)]
    #[case(Some(Uuid::nil()), false, FinalQuizStatus::NotPassed)]
    fn status_follows_final_quiz_and_attempts(
        #[case] final_quiz: Option<Uuid>,
        #[case] passed: bool,
        #[case] expected: FinalQuizStatus,
    ) {
        assert_eq!(final_quiz_status(final_quiz, passed), expected);
    }

    #[rstest]
    fn pool_error_maps_to_connection_error() {
        let error = map_pool_error(PoolError::build("invalid URL"));
        assert!(matches!(error, QuizAttemptRepositoryError::Connection { .. }));
    }
}
