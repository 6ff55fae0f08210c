//! PostgreSQL-backed `CourseRepository` implementation using Diesel ORM.
//!
//! Outlines are assembled from three reads (course, modules, lessons) inside
//! one transaction so every read observes the same snapshot.

use std::collections::HashMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{CourseRepository, CourseRepositoryError};
use crate::domain::{
    CourseId, CourseOutline, CourseSlug, CourseSummary, LessonContext, LessonId, LessonKind,
    LessonOutline, ModuleId, ModuleOutline, UserId,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{CourseRow, LessonRow, ModuleRow};
use super::pool::{DbPool, PoolError};
use super::schema::{course_modules, courses, lessons};

/// Diesel-backed implementation of the course read port.
#[derive(Clone)]
pub struct DieselCourseRepository {
    pool: DbPool,
}

impl DieselCourseRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CourseRepositoryError {
    map_basic_pool_error(error, |message| CourseRepositoryError::connection(message))
}

fn map_diesel_error(error: diesel::result::Error) -> CourseRepositoryError {
    map_basic_diesel_error(
        error,
        CourseRepositoryError::query,
        CourseRepositoryError::connection,
    )
}

/// Rows read for one course outline.
struct OutlineRows {
    course: CourseRow,
    modules: Vec<ModuleRow>,
    lessons: Vec<LessonRow>,
}

fn row_to_summary(row: CourseRow) -> Result<CourseSummary, CourseRepositoryError> {
    let slug = CourseSlug::new(row.slug)
        .map_err(|err| CourseRepositoryError::query(format!("invalid stored slug: {err}")))?;
    Ok(CourseSummary {
        id: CourseId::from_uuid(row.id),
        slug,
        title: row.title,
        thumbnail_url: row.thumbnail_url,
        instructor_id: UserId::from_uuid(row.instructor_id),
    })
}

fn row_to_lesson(row: LessonRow) -> Result<LessonOutline, CourseRepositoryError> {
    let kind = LessonKind::parse(&row.kind).ok_or_else(|| {
        CourseRepositoryError::query(format!("invalid stored lesson kind `{}`", row.kind))
    })?;
    Ok(LessonOutline {
        id: LessonId::from_uuid(row.id),
        position: row.position,
        kind,
        duration_seconds: row.duration_seconds,
    })
}

/// Group lesson rows under their modules, keeping position order.
fn rows_to_outline(rows: OutlineRows) -> Result<CourseOutline, CourseRepositoryError> {
    let OutlineRows {
        course,
        modules,
        lessons,
    } = rows;

    let mut by_module: HashMap<Uuid, Vec<LessonOutline>> = HashMap::new();
    for row in lessons {
        let module_id = row.module_id;
        by_module
            .entry(module_id)
            .or_default()
            .push(row_to_lesson(row)?);
    }

    let modules = modules
        .into_iter()
        .map(|module| {
            let mut lessons = by_module.remove(&module.id).unwrap_or_default();
            lessons.sort_by_key(|lesson| lesson.position);
            ModuleOutline {
                id: ModuleId::from_uuid(module.id),
                position: module.position,
                lessons,
            }
        })
        .collect();

    Ok(CourseOutline {
        course: row_to_summary(course)?,
        modules,
    })
}

async fn load_outline_rows(
    conn: &mut AsyncPgConnection,
    course: CourseRow,
) -> Result<OutlineRows, diesel::result::Error> {
    let modules: Vec<ModuleRow> = course_modules::table
        .filter(course_modules::course_id.eq(course.id))
        .order_by(course_modules::position)
        .select(ModuleRow::as_select())
        .load(conn)
        .await?;
    let module_ids: Vec<Uuid> = modules.iter().map(|module| module.id).collect();
    let lessons: Vec<LessonRow> = lessons::table
        .filter(lessons::module_id.eq_any(&module_ids))
        .order_by((lessons::module_id, lessons::position))
        .select(LessonRow::as_select())
        .load(conn)
        .await?;
    Ok(OutlineRows {
        course,
        modules,
        lessons,
    })
}

#[async_trait]
impl CourseRepository for DieselCourseRepository {
    async fn find_lesson_context(
        &self,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonContext>, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let lesson_uuid = *lesson_id.as_uuid();

        let found = conn
            .transaction(|conn| {
                async move {
                    let located: Option<(Uuid, CourseRow)> = lessons::table
                        .inner_join(course_modules::table.inner_join(courses::table))
                        .filter(lessons::id.eq(lesson_uuid))
                        .select((lessons::module_id, CourseRow::as_select()))
                        .first(conn)
                        .await
                        .optional()?;
                    let Some((module_id, course)) = located else {
                        return Ok(None);
                    };
                    let rows = load_outline_rows(conn, course).await?;
                    Ok(Some((module_id, rows)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        let Some((module_id, rows)) = found else {
            return Ok(None);
        };
        Ok(Some(LessonContext {
            lesson_id: *lesson_id,
            module_id: ModuleId::from_uuid(module_id),
            outline: rows_to_outline(rows)?,
        }))
    }

    async fn find_outline_by_slug(
        &self,
        slug: &CourseSlug,
    ) -> Result<Option<CourseOutline>, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let slug = slug.as_str().to_owned();

        let rows = conn
            .transaction(|conn| {
                async move {
                    let course: Option<CourseRow> = courses::table
                        .filter(courses::slug.eq(&slug))
                        .select(CourseRow::as_select())
                        .first(conn)
                        .await
                        .optional()?;
                    match course {
                        Some(course) => load_outline_rows(conn, course).await.map(Some),
                        None => Ok(None),
                    }
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        rows.map(rows_to_outline).transpose()
    }

    async fn find_summary_by_id(
        &self,
        course_id: &CourseId,
    ) -> Result<Option<CourseSummary>, CourseRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = courses::table
            .filter(courses::id.eq(course_id.as_uuid()))
            .select(CourseRow::as_select())
            .first::<CourseRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_summary).transpose()
    }
}

#[cfg(test)]
mod tests {
    //! Row grouping and conversion coverage; queries need a live database.

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn course_row() -> CourseRow {
        CourseRow {
            id: Uuid::new_v4(),
            slug: "rust-basics".to_owned(),
            title: "Rust Basics".to_owned(),
            thumbnail_url: None,
            instructor_id: Uuid::new_v4(),
        }
    }

    fn lesson_row(module_id: Uuid, position: i32) -> LessonRow {
        LessonRow {
            id: Uuid::new_v4(),
            module_id,
            position,
            kind: "video".to_owned(),
            duration_seconds: 60,
        }
    }

    #[rstest]
    fn outline_groups_lessons_by_module(course_row: CourseRow) {
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        let rows = OutlineRows {
            modules: vec![
                ModuleRow {
                    id: first,
                    position: 1,
                },
                ModuleRow {
                    id: second,
                    position: 2,
                },
            ],
            lessons: vec![
                lesson_row(first, 2),
                lesson_row(second, 1),
                lesson_row(first, 1),
            ],
            course: course_row,
        };

        let outline = rows_to_outline(rows).expect("valid rows");
        assert_eq!(outline.total_lessons(), 3);
        let positions: Vec<i32> = <[_]>::first(&outline.modules)
            .map(|module| module.lessons.iter().map(|lesson| lesson.position).collect())
            .unwrap_or_default();
        assert_eq!(positions, vec![1, 2]);
    }

    #[rstest]
    fn module_without_lessons_is_kept_empty(course_row: CourseRow) {
        let rows = OutlineRows {
            modules: vec![ModuleRow {
                id: Uuid::new_v4(),
                position: 1,
            }],
            lessons: Vec::new(),
            course: course_row,
        };
        let outline = rows_to_outline(rows).expect("valid rows");
        assert_eq!(outline.modules.len(), 1);
        assert_eq!(outline.total_lessons(), 0);
    }

    #[rstest]
    fn unknown_lesson_kind_is_a_query_error(course_row: CourseRow) {
        let module = Uuid::new_v4();
        let mut lesson = lesson_row(module, 1);
        lesson.kind = "podcast".to_owned();
        let rows = OutlineRows {
            modules: vec![ModuleRow {
                id: module,
                position: 1,
            }],
            lessons: vec![lesson],
            course: course_row,
        };
        assert!(matches!(
            rows_to_outline(rows),
            Err(CourseRepositoryError::Query { .. })
        ));
    }

    #[rstest]
    fn invalid_stored_slug_is_a_query_error(mut course_row: CourseRow) {
        course_row.slug = "Not A Slug".to_owned();
        assert!(matches!(
            row_to_summary(course_row),
            Err(CourseRepositoryError::Query { .. })
        ));
    }
}
