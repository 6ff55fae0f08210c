//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (repositories, cache, sinks, renderer, storage, email and the
//! task dispatcher) are implemented by outbound adapters. Driving ports
//! (`*Command` and `*Query`) are implemented by domain services and called
//! by inbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod cache_key;
mod certificate_command;
mod certificate_delivery;
mod certificate_query;
mod certificate_repository;
mod course_repository;
mod enrollment_repository;
mod event_sinks;
mod lesson_progress_repository;
mod progress_cache;
mod progress_command;
mod progress_query;
mod quiz_attempt_repository;
mod task_dispatcher;
mod user_directory;

pub use cache_key::{CacheInvalidation, CacheKey, CacheKeyValidationError};
#[cfg(test)]
pub use certificate_command::MockCertificateCommand;
pub use certificate_command::{CertificateCommand, FixtureCertificateCommand};
#[cfg(test)]
pub use certificate_delivery::{MockCertificateStorage, MockDocumentRenderer, MockEmailSender};
pub use certificate_delivery::{
    CertificateStorage, CertificateStorageError, DocumentRenderError, DocumentRenderer,
    EmailSendError, EmailSender, FixtureCertificateStorage, FixtureDocumentRenderer,
    FixtureEmailSender,
};
#[cfg(test)]
pub use certificate_query::MockCertificateQuery;
pub use certificate_query::{CertificateQuery, FixtureCertificateQuery};
#[cfg(test)]
pub use certificate_repository::MockCertificateRepository;
pub use certificate_repository::{
    CertificateRepository, CertificateRepositoryError, FixtureCertificateRepository,
};
#[cfg(test)]
pub use course_repository::MockCourseRepository;
pub use course_repository::{CourseRepository, CourseRepositoryError, FixtureCourseRepository};
#[cfg(test)]
pub use enrollment_repository::MockEnrollmentRepository;
pub use enrollment_repository::{
    EnrollmentRepository, EnrollmentRepositoryError, FixtureEnrollmentRepository,
};
#[cfg(test)]
pub use event_sinks::{MockActivityLogSink, MockNotificationSink};
pub use event_sinks::{ActivityLogSink, EventSinkError, FixtureEventSink, NotificationSink};
#[cfg(test)]
pub use lesson_progress_repository::MockLessonProgressRepository;
pub use lesson_progress_repository::{
    FixtureLessonProgressRepository, LessonProgressRepository, LessonProgressRepositoryError,
};
#[cfg(test)]
pub use progress_cache::MockProgressCache;
pub use progress_cache::{ProgressCache, ProgressCacheError};
#[cfg(test)]
pub use progress_command::MockProgressCommand;
pub use progress_command::{
    FixtureProgressCommand, LessonCompletionOutcome, ProgressCommand,
    RecordLessonCompletionRequest, ResetCourseProgressOutcome, ResetCourseProgressRequest,
};
#[cfg(test)]
pub use progress_query::MockProgressQuery;
pub use progress_query::{FixtureProgressQuery, ProgressQuery};
#[cfg(test)]
pub use quiz_attempt_repository::MockQuizAttemptRepository;
pub use quiz_attempt_repository::{
    FixtureQuizAttemptRepository, QuizAttemptRepository, QuizAttemptRepositoryError,
};
#[cfg(test)]
pub use task_dispatcher::MockTaskDispatcher;
pub use task_dispatcher::{BackgroundTask, TaskDispatchError, TaskDispatcher};
#[cfg(test)]
pub use user_directory::MockUserDirectory;
pub use user_directory::{FixtureUserDirectory, UserDirectory, UserDirectoryError};
