//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Concrete implementations of the learning-data ports backed by PostgreSQL
//! through `diesel-async` and a shared `bb8` pool.
//!
//! - **Thin adapters**: repositories only translate between Diesel rows and
//!   domain types. Progress arithmetic and completion detection stay in the
//!   domain.
//! - **Internal models**: row structs (`models.rs`) and table definitions
//!   (`schema.rs`) never leave this module.
//! - **Strongly typed errors**: Diesel and pool failures map onto each port's
//!   error enum; unique violations are told apart by constraint name.
//!
//! # Example
//!
//! ```ignore
//! use backend::outbound::persistence::{DbPool, DieselEnrollmentRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/lms")).await?;
//! let enrollments = DieselEnrollmentRepository::new(pool.clone());
//! ```

mod diesel_basic_error_mapping;
mod diesel_certificate_repository;
mod diesel_course_repository;
mod diesel_enrollment_repository;
mod diesel_event_sinks;
mod diesel_helpers;
mod diesel_lesson_progress_repository;
mod diesel_quiz_attempt_repository;
mod diesel_user_directory;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_certificate_repository::DieselCertificateRepository;
pub use diesel_course_repository::DieselCourseRepository;
pub use diesel_enrollment_repository::DieselEnrollmentRepository;
pub use diesel_event_sinks::{DieselActivityLogSink, DieselNotificationSink};
pub use diesel_lesson_progress_repository::DieselLessonProgressRepository;
pub use diesel_quiz_attempt_repository::DieselQuizAttemptRepository;
pub use diesel_user_directory::DieselUserDirectory;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
