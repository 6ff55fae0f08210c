//! PostgreSQL-backed `EnrollmentRepository` implementation using Diesel ORM.
//!
//! Progress writes are compare-and-swap updates filtered on the revision the
//! caller read. A zero-row update is disambiguated into a revision mismatch
//! or a vanished enrollment by re-reading the row on the same connection.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{EnrollmentRepository, EnrollmentRepositoryError};
use crate::domain::{CourseId, Enrollment, EnrollmentId, LessonId, ModuleId, UserId};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::diesel_helpers::{
    cast_revision, cast_revision_for_db, lesson_uuids, percent_for_db, percent_from_db,
};
use super::models::{EnrollmentProgressUpdate, EnrollmentRow};
use super::pool::{DbPool, PoolError};
use super::schema::{enrollments, lesson_progress};

/// Diesel-backed implementation of the enrollment port.
#[derive(Clone)]
pub struct DieselEnrollmentRepository {
    pool: DbPool,
}

impl DieselEnrollmentRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> EnrollmentRepositoryError {
    map_basic_pool_error(error, |message| {
        EnrollmentRepositoryError::connection(message)
    })
}

fn map_diesel_error(error: diesel::result::Error) -> EnrollmentRepositoryError {
    map_basic_diesel_error(
        error,
        EnrollmentRepositoryError::query,
        EnrollmentRepositoryError::connection,
    )
}

fn row_to_enrollment(row: EnrollmentRow) -> Enrollment {
    Enrollment {
        id: EnrollmentId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        course_id: CourseId::from_uuid(row.course_id),
        progress_percent: percent_from_db(row.progress_percent),
        last_accessed_lesson_id: row.last_accessed_lesson_id.map(LessonId::from_uuid),
        last_accessed_module_id: row.last_accessed_module_id.map(ModuleId::from_uuid),
        completed_at: row.completed_at,
        revision: cast_revision(row.revision),
        enrolled_at: row.enrolled_at,
    }
}

fn progress_update(enrollment: &Enrollment) -> EnrollmentProgressUpdate {
    EnrollmentProgressUpdate {
        progress_percent: percent_for_db(enrollment.progress_percent),
        last_accessed_lesson_id: enrollment.last_accessed_lesson_id.map(Uuid::from),
        last_accessed_module_id: enrollment.last_accessed_module_id.map(Uuid::from),
        completed_at: enrollment.completed_at,
        revision: cast_revision_for_db(enrollment.revision),
        updated_at: Utc::now(),
    }
}

/// Explain why a conditional update touched no rows.
async fn disambiguate_zero_rows(
    conn: &mut AsyncPgConnection,
    enrollment_id: Uuid,
    expected_revision: u32,
) -> EnrollmentRepositoryError {
    let current = enrollments::table
        .filter(enrollments::id.eq(enrollment_id))
        .select(enrollments::revision)
        .first::<i32>(conn)
        .await
        .optional();
    match current {
        Ok(Some(actual)) => {
            EnrollmentRepositoryError::revision_mismatch(expected_revision, cast_revision(actual))
        }
        Ok(None) => EnrollmentRepositoryError::missing(enrollment_id.to_string()),
        Err(error) => map_diesel_error(error),
    }
}

#[async_trait]
impl EnrollmentRepository for DieselEnrollmentRepository {
    async fn find_by_id(
        &self,
        enrollment_id: &EnrollmentId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = enrollments::table
            .filter(enrollments::id.eq(enrollment_id.as_uuid()))
            .select(EnrollmentRow::as_select())
            .first::<EnrollmentRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(row_to_enrollment))
    }

    async fn find_for_user_and_course(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = enrollments::table
            .filter(
                enrollments::user_id
                    .eq(user_id.as_uuid())
                    .and(enrollments::course_id.eq(course_id.as_uuid())),
            )
            .select(EnrollmentRow::as_select())
            .first::<EnrollmentRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(row_to_enrollment))
    }

    async fn save_progress(
        &self,
        enrollment: &Enrollment,
        expected_revision: u32,
    ) -> Result<(), EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let enrollment_id = *enrollment.id.as_uuid();

        let updated_rows = diesel::update(enrollments::table)
            .filter(
                enrollments::id
                    .eq(enrollment_id)
                    .and(enrollments::revision.eq(cast_revision_for_db(expected_revision))),
            )
            .set(&progress_update(enrollment))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        if updated_rows == 0 {
            return Err(disambiguate_zero_rows(&mut conn, enrollment_id, expected_revision).await);
        }
        Ok(())
    }

    async fn reset_progress(
        &self,
        enrollment: &Enrollment,
        lesson_ids: &[LessonId],
    ) -> Result<u64, EnrollmentRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let enrollment_id = *enrollment.id.as_uuid();
        let user_id = *enrollment.user_id.as_uuid();
        let lesson_ids = lesson_uuids(lesson_ids);
        let update = progress_update(enrollment);

        // The reset is an administrative override: it bumps the stored
        // revision rather than comparing against it.
        let (deleted, updated_rows) = conn
            .transaction(|conn| {
                async move {
                    let deleted = diesel::delete(
                        lesson_progress::table.filter(
                            lesson_progress::user_id
                                .eq(user_id)
                                .and(lesson_progress::lesson_id.eq_any(&lesson_ids)),
                        ),
                    )
                    .execute(conn)
                    .await?;
                    let updated_rows = diesel::update(enrollments::table)
                        .filter(enrollments::id.eq(enrollment_id))
                        .set((
                            enrollments::progress_percent.eq(update.progress_percent),
                            enrollments::last_accessed_lesson_id.eq(None::<Uuid>),
                            enrollments::last_accessed_module_id.eq(None::<Uuid>),
                            enrollments::completed_at.eq(None::<chrono::DateTime<Utc>>),
                            enrollments::revision.eq(enrollments::revision + 1),
                            enrollments::updated_at.eq(update.updated_at),
                        ))
                        .execute(conn)
                        .await?;
                    Ok((deleted, updated_rows))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        if updated_rows == 0 {
            return Err(EnrollmentRepositoryError::missing(enrollment_id.to_string()));
        }
        debug!(%enrollment_id, deleted, "enrollment progress reset");
        Ok(u64::try_from(deleted).unwrap_or(u64::MAX))
    }
}
