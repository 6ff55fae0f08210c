//! Append-only events emitted by the progress pipeline.
//!
//! Notifications are addressed to a recipient and rendered in their inbox.
//! Activity rows feed the audit trail. Neither is read back by the pipeline.

use serde_json::Value;

use super::UserId;

/// Kind of in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Sent to the instructor when a learner completes their course.
    CourseCompleted,
    /// Sent to the learner when their certificate is ready.
    CertificateIssued,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CourseCompleted => "course_completed",
            Self::CertificateIssued => "certificate_issued",
        }
    }
}

/// Notification to append for a recipient.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub content: String,
    pub metadata: Value,
}

/// Audit activity recorded against a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivityType {
    LessonCompleted,
    CourseCompleted,
    ProgressReset,
}

impl ActivityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LessonCompleted => "lesson_completed",
            Self::CourseCompleted => "course_completed",
            Self::ProgressReset => "progress_reset",
        }
    }
}

/// Activity row to append.
#[derive(Debug, Clone, PartialEq)]
pub struct NewActivity {
    pub user_id: UserId,
    pub activity_type: ActivityType,
    pub details: Value,
    pub ip_address: Option<String>,
}

impl NewActivity {
    /// Activity without a client address.
    pub fn new(user_id: UserId, activity_type: ActivityType, details: Value) -> Self {
        Self {
            user_id,
            activity_type,
            details,
            ip_address: None,
        }
    }
}

/// HTML email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}
