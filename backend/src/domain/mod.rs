//! Domain primitives, aggregates and services.
//!
//! Purpose: model course progress, completion and certificate issuance
//! independently of transport and storage. Inbound adapters call the driving
//! ports implemented by the services here; the services reach the outside
//! world only through the driven ports in [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport-agnostic failure payload.
//! - ErrorCode (alias to `error::ErrorCode`): stable error identifier.
//! - ProgressService, CertificateService: driving port implementations.

pub mod certificate;
pub mod certificate_service;
pub mod completion;
pub mod course;
pub mod error;
pub mod events;
pub mod ids;
pub mod ports;
pub mod progress;
pub mod progress_service;
pub mod side_effects;
pub mod trace_id;
pub mod user;

pub use self::certificate::{
    CERTIFICATE_CODE_LENGTH, CERTIFICATE_CODE_PREFIX, Certificate, CertificateCode,
    CertificateCodeError, CertificateDocument, CertificateSnapshot, CertificateVerification,
    format_long_date,
};
pub use self::certificate_service::{
    CertificateCodeSource, CertificatePorts, CertificateService, CertificateSettings,
    FixedCodeSource, RandomCodeSource,
};
pub use self::completion::{
    CompletionPolicy, CourseCompleted, FinalQuizStatus, ParseCompletionPolicyError,
    detect_completion, should_auto_issue,
};
pub use self::course::{
    CourseOutline, CourseSlug, CourseSlugError, CourseSummary, LessonContext, LessonKind,
    LessonOutline, ModuleOutline,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::events::{
    ActivityType, NewActivity, NewNotification, NotificationKind, OutgoingEmail,
};
pub use self::ids::{
    CertificateId, CourseId, EnrollmentId, IdParseError, LessonId, ModuleId, UserId,
};
pub use self::progress::{
    CourseProgressView, Enrollment, LessonProgress, LessonStatus, NewLessonProgress,
    ProgressError, ProgressPercent,
};
pub use self::progress_service::{ProgressRepositories, ProgressService, ProgressSettings};
pub use self::side_effects::{SideEffect, SideEffectPorts, SideEffectRunner};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{Actor, ParseUserRoleError, UserProfile, UserRole};
