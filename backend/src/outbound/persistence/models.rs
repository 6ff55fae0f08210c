//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Repositories convert them into validated
//! domain values at the boundary.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    activity_logs, certificates, course_modules, courses, enrollments, lesson_progress, lessons,
    notifications, users,
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub display_name: String,
    pub email: String,
    pub role: String,
}

// ---------------------------------------------------------------------------
// Course structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = courses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CourseRow {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub instructor_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = course_modules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ModuleRow {
    pub id: Uuid,
    pub position: i32,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lessons)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LessonRow {
    pub id: Uuid,
    pub module_id: Uuid,
    pub position: i32,
    pub kind: String,
    pub duration_seconds: i32,
}

// ---------------------------------------------------------------------------
// Enrollments and lesson progress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = enrollments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EnrollmentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub progress_percent: i16,
    pub last_accessed_lesson_id: Option<Uuid>,
    pub last_accessed_module_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub revision: i32,
    pub enrolled_at: DateTime<Utc>,
}

/// Progress projection written by compare-and-swap updates and the reset.
///
/// `treat_none_as_null` makes a reset clear the nullable columns instead of
/// skipping them.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = enrollments)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct EnrollmentProgressUpdate {
    pub progress_percent: i16,
    pub last_accessed_lesson_id: Option<Uuid>,
    pub last_accessed_module_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub revision: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = lesson_progress)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LessonProgressRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub status: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = lesson_progress)]
pub(crate) struct NewLessonProgressRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub lesson_id: Uuid,
    pub status: &'a str,
    pub completed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = certificates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CertificateRow {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub code: String,
    pub document_ref: String,
    pub student_name: String,
    pub student_email: String,
    pub course_title: String,
    pub completed_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = certificates)]
pub(crate) struct NewCertificateRow<'a> {
    pub id: Uuid,
    pub enrollment_id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub code: &'a str,
    pub document_ref: &'a str,
    pub student_name: &'a str,
    pub student_email: &'a str,
    pub course_title: &'a str,
    pub completed_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Event sinks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notifications)]
pub(crate) struct NewNotificationRow<'a> {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: &'a str,
    pub content: &'a str,
    pub metadata: &'a serde_json::Value,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = activity_logs)]
pub(crate) struct NewActivityRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub activity_type: &'a str,
    pub details: &'a serde_json::Value,
    pub ip_address: Option<&'a str>,
}
