//! PostgreSQL-backed `LessonProgressRepository` implementation.
//!
//! Inserts rely on the `lesson_progress_user_lesson_key` unique constraint:
//! of two concurrent completions of the same lesson exactly one row lands and
//! the other insert reports a duplicate.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::domain::ports::{LessonProgressRepository, LessonProgressRepositoryError};
use crate::domain::{LessonId, LessonProgress, LessonStatus, NewLessonProgress, UserId};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation_constraint,
};
use super::diesel_helpers::lesson_uuids;
use super::models::{LessonProgressRow, NewLessonProgressRow};
use super::pool::{DbPool, PoolError};
use super::schema::lesson_progress;

/// Diesel-backed implementation of the lesson progress port.
#[derive(Clone)]
pub struct DieselLessonProgressRepository {
    pool: DbPool,
}

impl DieselLessonProgressRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> LessonProgressRepositoryError {
    map_basic_pool_error(error, |message| {
        LessonProgressRepositoryError::connection(message)
    })
}

fn map_diesel_error(error: diesel::result::Error) -> LessonProgressRepositoryError {
    if unique_violation_constraint(&error).is_some() {
        return LessonProgressRepositoryError::duplicate();
    }
    map_basic_diesel_error(
        error,
        LessonProgressRepositoryError::query,
        LessonProgressRepositoryError::connection,
    )
}

fn row_to_progress(row: LessonProgressRow) -> Result<LessonProgress, LessonProgressRepositoryError> {
    let status = match row.status.as_str() {
        "completed" => LessonStatus::Completed,
        other => {
            return Err(LessonProgressRepositoryError::query(format!(
                "invalid stored lesson status `{other}`"
            )));
        }
    };
    Ok(LessonProgress {
        id: row.id,
        user_id: UserId::from_uuid(row.user_id),
        lesson_id: LessonId::from_uuid(row.lesson_id),
        status,
        completed_at: row.completed_at,
    })
}

#[async_trait]
impl LessonProgressRepository for DieselLessonProgressRepository {
    async fn insert(
        &self,
        progress: &NewLessonProgress,
    ) -> Result<LessonProgress, LessonProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let new_row = NewLessonProgressRow {
            id: Uuid::new_v4(),
            user_id: *progress.user_id.as_uuid(),
            lesson_id: *progress.lesson_id.as_uuid(),
            status: LessonStatus::Completed.as_str(),
            completed_at: progress.completed_at,
        };

        let row = diesel::insert_into(lesson_progress::table)
            .values(&new_row)
            .returning(LessonProgressRow::as_returning())
            .get_result::<LessonProgressRow>(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        row_to_progress(row)
    }

    async fn find(
        &self,
        user_id: &UserId,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonProgress>, LessonProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = lesson_progress::table
            .filter(
                lesson_progress::user_id
                    .eq(user_id.as_uuid())
                    .and(lesson_progress::lesson_id.eq(lesson_id.as_uuid())),
            )
            .select(LessonProgressRow::as_select())
            .first::<LessonProgressRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_progress).transpose()
    }

    async fn count_completed(
        &self,
        user_id: &UserId,
        lesson_ids: &[LessonId],
    ) -> Result<u32, LessonProgressRepositoryError> {
        if lesson_ids.is_empty() {
            return Ok(0);
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let count: i64 = lesson_progress::table
            .filter(
                lesson_progress::user_id
                    .eq(user_id.as_uuid())
                    .and(lesson_progress::lesson_id.eq_any(lesson_uuids(lesson_ids))),
            )
            .count()
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        u32::try_from(count).map_err(|_| {
            LessonProgressRepositoryError::query(format!("completion count out of range: {count}"))
        })
    }

    async fn list_completed(
        &self,
        user_id: &UserId,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<LessonId>, LessonProgressRepositoryError> {
        if lesson_ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let ids: Vec<Uuid> = lesson_progress::table
            .filter(
                lesson_progress::user_id
                    .eq(user_id.as_uuid())
                    .and(lesson_progress::lesson_id.eq_any(lesson_uuids(lesson_ids))),
            )
            .order_by(lesson_progress::completed_at)
            .select(lesson_progress::lesson_id)
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(ids.into_iter().map(LessonId::from_uuid).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use diesel::result::{DatabaseErrorKind, Error as DieselError};
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn unique_violation_maps_to_duplicate() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new("lesson_progress_user_lesson_key".to_owned()),
        );
        assert_eq!(
            map_diesel_error(error),
            LessonProgressRepositoryError::Duplicate
        );
    }

    #[rstest]
    #[case("completed", true)]
    #[case("started", false)]
    fn stored_status_must_be_known(#[case] status: &str, #[case] ok: bool) {
        let row = LessonProgressRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            lesson_id: Uuid::new_v4(),
            status: status.to_owned(),
            completed_at: Utc::now(),
        };
        assert_eq!(row_to_progress(row).is_ok(), ok);
    }
}
