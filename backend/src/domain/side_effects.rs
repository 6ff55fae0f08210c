//! Explicit side effects returned by write operations.
//!
//! Services decide *what* should happen after a successful write and hand the
//! list to [`SideEffectRunner`]. Cache invalidation runs inline so the next
//! read observes fresh data. Everything else is submitted to the
//! [`TaskDispatcher`] and may finish after the response has been sent.
//! No effect can fail the operation that produced it.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::domain::ports::{
    ActivityLogSink, BackgroundTask, CacheInvalidation, CertificateCommand, EmailSender,
    NotificationSink, ProgressCache, TaskDispatcher, UserDirectory,
};
use crate::domain::{
    CourseSummary, EnrollmentId, NewActivity, NewNotification, NotificationKind, OutgoingEmail,
    TraceId, UserId,
};

/// Follow-up work produced by a write.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// Drop stale cache entries.
    InvalidateCache(CacheInvalidation),
    /// Append an audit activity row.
    RecordActivity(NewActivity),
    /// Tell the course instructor that a learner completed the course.
    NotifyCourseCompleted {
        student_id: UserId,
        course: CourseSummary,
    },
    /// Append a prepared notification.
    Notify(NewNotification),
    /// Deliver an email.
    SendEmail(OutgoingEmail),
    /// Issue the certificate of a completed enrollment.
    IssueCertificate {
        user_id: UserId,
        enrollment_id: EnrollmentId,
    },
}

impl SideEffect {
    /// Short name used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::InvalidateCache(_) => "invalidate_cache",
            Self::RecordActivity(_) => "record_activity",
            Self::NotifyCourseCompleted { .. } => "notify_course_completed",
            Self::Notify(_) => "notify",
            Self::SendEmail(_) => "send_email",
            Self::IssueCertificate { .. } => "issue_certificate",
        }
    }
}

/// Driven ports used to execute side effects.
#[derive(Clone)]
pub struct SideEffectPorts {
    pub cache: Arc<dyn ProgressCache>,
    pub dispatcher: Arc<dyn TaskDispatcher>,
    pub activity: Arc<dyn ActivityLogSink>,
    pub notifications: Arc<dyn NotificationSink>,
    pub users: Arc<dyn UserDirectory>,
    pub email: Arc<dyn EmailSender>,
}

/// Executes [`SideEffect`] lists best-effort.
#[derive(Clone)]
pub struct SideEffectRunner {
    ports: SideEffectPorts,
    issuer: Option<Arc<dyn CertificateCommand>>,
}

impl SideEffectRunner {
    /// Runner without certificate issuance.
    pub fn new(ports: SideEffectPorts) -> Self {
        Self {
            ports,
            issuer: None,
        }
    }

    /// Attach the certificate issuer used by [`SideEffect::IssueCertificate`].
    pub fn with_issuer(mut self, issuer: Arc<dyn CertificateCommand>) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Execute every effect. Failures are logged and never returned.
    pub async fn run(&self, effects: Vec<SideEffect>) {
        for effect in effects {
            match effect {
                SideEffect::InvalidateCache(invalidation) => self.invalidate(invalidation).await,
                other => self.dispatch(other).await,
            }
        }
    }

    async fn invalidate(&self, invalidation: CacheInvalidation) {
        let result = match &invalidation {
            CacheInvalidation::Key(key) => self.ports.cache.delete(key).await.map(|()| 1),
            CacheInvalidation::Prefix(prefix) => self.ports.cache.delete_by_prefix(prefix).await,
        };
        match result {
            Ok(removed) => debug!(?invalidation, removed, "cache invalidated"),
            Err(error) => warn!(
                effect = "invalidate_cache",
                ?invalidation,
                error = %error,
                "cache invalidation failed"
            ),
        }
    }

    async fn dispatch(&self, effect: SideEffect) {
        let label = effect.label();
        let Some(task) = self.task_for(effect) else {
            return;
        };
        if let Err(error) = self.ports.dispatcher.dispatch(task).await {
            warn!(effect = label, error = %error, "side effect could not be dispatched");
        }
    }

    fn task_for(&self, effect: SideEffect) -> Option<BackgroundTask> {
        let label = effect.label();
        let task = match effect {
            SideEffect::InvalidateCache(_) => return None,
            SideEffect::RecordActivity(activity) => {
                let sink = Arc::clone(&self.ports.activity);
                BackgroundTask::new(
                    label,
                    TraceId::bind_current(async move {
                        sink.append(&activity).await.map_err(|err| err.to_string())
                    }),
                )
            }
            SideEffect::Notify(notification) => {
                let sink = Arc::clone(&self.ports.notifications);
                BackgroundTask::new(
                    label,
                    TraceId::bind_current(async move {
                        sink.append(&notification)
                            .await
                            .map_err(|err| err.to_string())
                    }),
                )
            }
            SideEffect::NotifyCourseCompleted { student_id, course } => {
                let users = Arc::clone(&self.ports.users);
                let sink = Arc::clone(&self.ports.notifications);
                BackgroundTask::new(
                    label,
                    TraceId::bind_current(async move {
                        let student_name = users
                            .find_profile(&student_id)
                            .await
                            .map_err(|err| err.to_string())?
                            .map_or_else(|| "A student".to_owned(), |p| p.display_name);
                        let notification =
                            course_completed_notification(student_id, &student_name, &course);
                        sink.append(&notification)
                            .await
                            .map_err(|err| err.to_string())
                    }),
                )
            }
            SideEffect::SendEmail(email) => {
                let sender = Arc::clone(&self.ports.email);
                BackgroundTask::new(
                    label,
                    TraceId::bind_current(async move {
                        sender.send(&email).await.map_err(|err| err.to_string())
                    }),
                )
            }
            SideEffect::IssueCertificate {
                user_id,
                enrollment_id,
            } => {
                let Some(issuer) = self.issuer.clone() else {
                    warn!(
                        effect = label,
                        %enrollment_id,
                        "no certificate issuer configured; skipping automatic issuance"
                    );
                    return None;
                };
                BackgroundTask::new(
                    label,
                    TraceId::bind_current(async move {
                        issuer
                            .issue_certificate(&user_id, &enrollment_id)
                            .await
                            .map(|_| ())
                            .map_err(|err| err.to_string())
                    }),
                )
            }
        };
        Some(task)
    }
}

/// Notification addressed to the instructor of `course`.
pub fn course_completed_notification(
    student_id: UserId,
    student_name: &str,
    course: &CourseSummary,
) -> NewNotification {
    NewNotification {
        recipient_id: course.instructor_id,
        kind: NotificationKind::CourseCompleted,
        content: format!("{student_name} completed {}", course.title),
        metadata: json!({
            "studentId": student_id,
            "studentName": student_name,
            "courseId": course.id,
            "courseSlug": course.slug,
            "courseTitle": course.title,
            "thumbnailUrl": course.thumbnail_url,
        }),
    }
}

#[cfg(test)]
#[path = "side_effects_tests.rs"]
mod tests;
