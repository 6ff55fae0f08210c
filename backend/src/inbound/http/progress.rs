//! Course progress HTTP handlers.
//!
//! ```text
//! POST /api/v1/courses/{slug}/lessons/{lesson_id}/complete
//! GET  /api/v1/courses/{slug}/progress
//! POST /api/v1/admin/users/{user_id}/courses/{slug}/reset
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{
    LessonCompletionOutcome, RecordLessonCompletionRequest, ResetCourseProgressOutcome,
    ResetCourseProgressRequest,
};
use crate::domain::{CourseProgressView, Enrollment, LessonId, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::private_no_cache_header;
use crate::inbound::http::identity::AuthenticatedActor;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_id, parse_optional_rfc3339_timestamp, parse_slug,
};

const SLUG: FieldName = FieldName::new("slug");
const LESSON_ID: FieldName = FieldName::new("lessonId");
const USER_ID: FieldName = FieldName::new("userId");
const COMPLETED_AT: FieldName = FieldName::new("completedAt");

/// Optional body of a lesson completion.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonRequest {
    /// RFC 3339 completion time; defaults to the server clock.
    #[schema(example = "2026-01-15T09:30:00Z")]
    pub completed_at: Option<String>,
}

/// Enrollment state returned by progress writes.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentProgressResponse {
    pub enrollment_id: String,
    pub course_id: String,
    #[schema(minimum = 0, maximum = 100, example = 50)]
    pub progress_percent: u8,
    pub last_accessed_lesson_id: Option<String>,
    pub last_accessed_module_id: Option<String>,
    pub completed_at: Option<String>,
}

impl From<&Enrollment> for EnrollmentProgressResponse {
    fn from(value: &Enrollment) -> Self {
        Self {
            enrollment_id: value.id.to_string(),
            course_id: value.course_id.to_string(),
            progress_percent: value.progress_percent.value(),
            last_accessed_lesson_id: value.last_accessed_lesson_id.map(|id| id.to_string()),
            last_accessed_module_id: value.last_accessed_module_id.map(|id| id.to_string()),
            completed_at: value.completed_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Response of a recorded lesson completion.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletionResponse {
    pub lesson_id: String,
    pub status: String,
    pub lesson_completed_at: String,
    /// True only for the completion that moved the course to 100 percent.
    pub course_completed: bool,
    pub enrollment: EnrollmentProgressResponse,
}

impl From<LessonCompletionOutcome> for LessonCompletionResponse {
    fn from(value: LessonCompletionOutcome) -> Self {
        Self {
            lesson_id: value.progress.lesson_id.to_string(),
            status: value.progress.status.as_str().to_owned(),
            lesson_completed_at: value.progress.completed_at.to_rfc3339(),
            course_completed: value.course_completed,
            enrollment: EnrollmentProgressResponse::from(&value.enrollment),
        }
    }
}

/// Learn-page progress of the caller in one course.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressResponse {
    pub course_slug: String,
    pub course_title: String,
    pub enrollment_id: String,
    pub total_lessons: u32,
    pub completed_lesson_ids: Vec<String>,
    #[schema(minimum = 0, maximum = 100)]
    pub progress_percent: u8,
    pub last_accessed_lesson_id: Option<String>,
    pub last_accessed_module_id: Option<String>,
    pub completed_at: Option<String>,
}

impl From<CourseProgressView> for CourseProgressResponse {
    fn from(value: CourseProgressView) -> Self {
        Self {
            course_slug: value.course_slug.to_string(),
            course_title: value.course_title,
            enrollment_id: value.enrollment_id.to_string(),
            total_lessons: value.total_lessons,
            completed_lesson_ids: value
                .completed_lesson_ids
                .into_iter()
                .map(|id| id.to_string())
                .collect(),
            progress_percent: value.progress_percent.value(),
            last_accessed_lesson_id: value.last_accessed_lesson_id.map(|id| id.to_string()),
            last_accessed_module_id: value.last_accessed_module_id.map(|id| id.to_string()),
            completed_at: value.completed_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Response of an administrative progress reset.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetProgressResponse {
    pub deleted_lessons: u64,
    pub enrollment: EnrollmentProgressResponse,
}

impl From<ResetCourseProgressOutcome> for ResetProgressResponse {
    fn from(value: ResetCourseProgressOutcome) -> Self {
        Self {
            deleted_lessons: value.deleted_lessons,
            enrollment: EnrollmentProgressResponse::from(&value.enrollment),
        }
    }
}

/// Mark a lesson complete for the caller.
#[utoipa::path(
    post,
    path = "/api/v1/courses/{slug}/lessons/{lesson_id}/complete",
    params(
        ("slug" = String, Path, description = "Course slug"),
        ("lesson_id" = String, Path, description = "Lesson UUID")
    ),
    request_body(content = CompleteLessonRequest, description = "Optional completion time"),
    responses(
        (status = 200, description = "Completion recorded", body = LessonCompletionResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Lesson or enrollment not found", body = ErrorSchema),
        (status = 409, description = "Lesson already completed", body = ErrorSchema),
        (status = 422, description = "Course has no lessons", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["progress"],
    operation_id = "completeLesson"
)]
#[post("/courses/{slug}/lessons/{lesson_id}/complete")]
pub async fn complete_lesson(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<(String, String)>,
    payload: Option<web::Json<CompleteLessonRequest>>,
) -> ApiResult<web::Json<LessonCompletionResponse>> {
    let (slug, lesson_id) = path.into_inner();
    let course_slug = parse_slug(&slug, SLUG)?;
    let lesson_id: LessonId = parse_id(&lesson_id, LESSON_ID)?;
    let payload = payload.map(web::Json::into_inner).unwrap_or_default();
    let completed_at =
        parse_optional_rfc3339_timestamp(payload.completed_at.as_deref(), COMPLETED_AT)?;

    let outcome = state
        .progress
        .record_lesson_completion(RecordLessonCompletionRequest {
            user_id: actor.user_id(),
            lesson_id,
            course_slug: Some(course_slug),
            completed_at,
        })
        .await?;
    Ok(web::Json(LessonCompletionResponse::from(outcome)))
}

/// Fetch the caller's progress in a course.
#[utoipa::path(
    get,
    path = "/api/v1/courses/{slug}/progress",
    params(("slug" = String, Path, description = "Course slug")),
    responses(
        (
            status = 200,
            description = "Course progress",
            headers(("Cache-Control" = String, description = "Cache control header")),
            body = CourseProgressResponse
        ),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Course or enrollment not found", body = ErrorSchema)
    ),
    tags = ["progress"],
    operation_id = "getCourseProgress"
)]
#[get("/courses/{slug}/progress")]
pub async fn get_course_progress(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let course_slug = parse_slug(&path.into_inner(), SLUG)?;
    let view = state
        .progress_query
        .course_progress(&actor.user_id(), &course_slug)
        .await?;
    Ok(HttpResponse::Ok()
        .insert_header(private_no_cache_header())
        .json(CourseProgressResponse::from(view)))
}

/// Clear a learner's progress in a course.
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{user_id}/courses/{slug}/reset",
    params(
        ("user_id" = String, Path, description = "Learner UUID"),
        ("slug" = String, Path, description = "Course slug")
    ),
    responses(
        (status = 200, description = "Progress reset", body = ResetProgressResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Caller may not reset this course", body = ErrorSchema),
        (status = 404, description = "Course or enrollment not found", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "resetCourseProgress"
)]
#[post("/admin/users/{user_id}/courses/{slug}/reset")]
pub async fn reset_course_progress(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<(String, String)>,
) -> ApiResult<web::Json<ResetProgressResponse>> {
    let (user_id, slug) = path.into_inner();
    let user_id: UserId = parse_id(&user_id, USER_ID)?;
    let course_slug = parse_slug(&slug, SLUG)?;

    let outcome = state
        .progress
        .reset_course_progress(ResetCourseProgressRequest {
            actor: actor.actor(),
            user_id,
            course_slug,
        })
        .await?;
    Ok(web::Json(ResetProgressResponse::from(outcome)))
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
