//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `backend/migrations` exactly. When a
//! migration changes a table, update this file by hand or regenerate it with
//! `diesel print-schema`.

diesel::table! {
    /// Read-only mirror of the identity service's user records.
    users (id) {
        id -> Uuid,
        display_name -> Varchar,
        email -> Varchar,
        /// One of `student`, `instructor` or `admin`.
        role -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    courses (id) {
        id -> Uuid,
        /// Unique URL-safe identifier.
        slug -> Varchar,
        title -> Varchar,
        thumbnail_url -> Nullable<Varchar>,
        instructor_id -> Uuid,
        /// Denormalised sum of lesson durations.
        total_duration_seconds -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    course_modules (id) {
        id -> Uuid,
        course_id -> Uuid,
        /// Unique within the course.
        position -> Int4,
        title -> Varchar,
        duration_seconds -> Int8,
    }
}

diesel::table! {
    lessons (id) {
        id -> Uuid,
        module_id -> Uuid,
        /// Unique within the module.
        position -> Int4,
        /// One of `text`, `video` or `quiz`.
        kind -> Varchar,
        title -> Varchar,
        duration_seconds -> Int4,
        quiz_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    /// One row per (user, course); progress writes are guarded by `revision`.
    enrollments (id) {
        id -> Uuid,
        user_id -> Uuid,
        course_id -> Uuid,
        progress_percent -> Int2,
        last_accessed_lesson_id -> Nullable<Uuid>,
        last_accessed_module_id -> Nullable<Uuid>,
        completed_at -> Nullable<Timestamptz>,
        revision -> Int4,
        enrolled_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Insert-only completion rows, unique per (user, lesson).
    lesson_progress (id) {
        id -> Uuid,
        user_id -> Uuid,
        lesson_id -> Uuid,
        status -> Varchar,
        completed_at -> Timestamptz,
    }
}

diesel::table! {
    quizzes (id) {
        id -> Uuid,
        course_id -> Uuid,
        title -> Varchar,
        is_final -> Bool,
        passing_score -> Int4,
    }
}

diesel::table! {
    quiz_attempts (id) {
        id -> Uuid,
        quiz_id -> Uuid,
        user_id -> Uuid,
        score -> Int4,
        passed -> Bool,
        submitted_at -> Timestamptz,
    }
}

diesel::table! {
    /// Issued certificates with their display snapshot.
    certificates (id) {
        id -> Uuid,
        enrollment_id -> Uuid,
        user_id -> Uuid,
        course_id -> Uuid,
        code -> Varchar,
        document_ref -> Varchar,
        student_name -> Varchar,
        student_email -> Varchar,
        course_title -> Varchar,
        completed_at -> Timestamptz,
        issued_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    notifications (id) {
        id -> Uuid,
        recipient_id -> Uuid,
        kind -> Varchar,
        content -> Text,
        metadata -> Jsonb,
        is_read -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    activity_logs (id) {
        id -> Uuid,
        user_id -> Uuid,
        activity_type -> Varchar,
        details -> Jsonb,
        ip_address -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(courses -> users (instructor_id));
diesel::joinable!(course_modules -> courses (course_id));
diesel::joinable!(lessons -> course_modules (module_id));
diesel::joinable!(enrollments -> courses (course_id));
diesel::joinable!(lesson_progress -> lessons (lesson_id));
diesel::joinable!(quizzes -> courses (course_id));
diesel::joinable!(quiz_attempts -> quizzes (quiz_id));
diesel::joinable!(certificates -> enrollments (enrollment_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    courses,
    course_modules,
    lessons,
    enrollments,
    lesson_progress,
    quizzes,
    quiz_attempts,
    certificates,
    notifications,
    activity_logs,
);
