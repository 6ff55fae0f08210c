//! Tests for the side-effect runner.

use std::sync::Arc;

use rstest::rstest;
use serde_json::json;

use super::*;
use crate::domain::ports::{
    CacheKey, EventSinkError, FixtureEmailSender, FixtureEventSink, FixtureUserDirectory,
    MockActivityLogSink, MockCertificateCommand, MockNotificationSink, MockProgressCache,
    MockTaskDispatcher, MockUserDirectory, ProgressCacheError, TaskDispatchError,
};
use crate::domain::{ActivityType, CourseId, CourseSlug, Error, UserProfile, UserRole};
use crate::test_support::{InMemoryProgressCache, InlineTaskDispatcher};

fn ports() -> SideEffectPorts {
    SideEffectPorts {
        cache: Arc::new(InMemoryProgressCache::default()),
        dispatcher: Arc::new(InlineTaskDispatcher),
        activity: Arc::new(FixtureEventSink),
        notifications: Arc::new(FixtureEventSink),
        users: Arc::new(FixtureUserDirectory),
        email: Arc::new(FixtureEmailSender),
    }
}

fn course(instructor_id: UserId) -> CourseSummary {
    CourseSummary {
        id: CourseId::random(),
        slug: CourseSlug::new("rust-basics").expect("valid slug"),
        title: "Rust Basics".to_owned(),
        thumbnail_url: Some("https://cdn.example.com/rust.png".to_owned()),
        instructor_id,
    }
}

#[tokio::test]
async fn invalidations_run_inline_without_the_dispatcher() {
    let mut cache = MockProgressCache::new();
    cache.expect_delete().times(1).returning(|_| Ok(()));
    cache
        .expect_delete_by_prefix()
        .times(1)
        .returning(|_| Err(ProgressCacheError::backend("redis down")));
    let mut dispatcher = MockTaskDispatcher::new();
    dispatcher.expect_dispatch().never();

    let runner = SideEffectRunner::new(SideEffectPorts {
        cache: Arc::new(cache),
        dispatcher: Arc::new(dispatcher),
        ..ports()
    });
    let slug = CourseSlug::new("rust-basics").expect("valid slug");

    runner
        .run(vec![
            SideEffect::InvalidateCache(CacheInvalidation::Key(CacheKey::certificates(
                &UserId::random(),
            ))),
            SideEffect::InvalidateCache(CacheInvalidation::Prefix(CacheKey::course_stats_prefix(
                &slug,
            ))),
        ])
        .await;
}

#[tokio::test]
async fn activity_is_appended_through_the_dispatcher() {
    let user_id = UserId::random();
    let mut activity = MockActivityLogSink::new();
    activity
        .expect_append()
        .withf(move |row| row.user_id == user_id && row.activity_type == ActivityType::LessonCompleted)
        .times(1)
        .returning(|_| Ok(()));

    let runner = SideEffectRunner::new(SideEffectPorts {
        activity: Arc::new(activity),
        ..ports()
    });

    runner
        .run(vec![SideEffect::RecordActivity(NewActivity::new(
            user_id,
            ActivityType::LessonCompleted,
            json!({}),
        ))])
        .await;
}

#[tokio::test]
async fn course_completion_notifies_the_instructor_with_student_name() {
    let instructor = UserId::random();
    let student = UserId::random();
    let summary = course(instructor);
    let course_id = summary.id;

    let mut users = MockUserDirectory::new();
    users.expect_find_profile().times(1).returning(move |id| {
        Ok(Some(UserProfile {
            id: *id,
            display_name: "Ada Lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
            role: UserRole::Student,
        }))
    });
    let mut notifications = MockNotificationSink::new();
    notifications
        .expect_append()
        .withf(move |n| {
            n.recipient_id == instructor
                && n.kind == NotificationKind::CourseCompleted
                && n.metadata["studentName"] == "Ada Lovelace"
                && n.metadata["courseId"] == json!(course_id)
                && n.metadata["thumbnailUrl"] == "https://cdn.example.com/rust.png"
        })
        .times(1)
        .returning(|_| Ok(()));

    let runner = SideEffectRunner::new(SideEffectPorts {
        users: Arc::new(users),
        notifications: Arc::new(notifications),
        ..ports()
    });

    runner
        .run(vec![SideEffect::NotifyCourseCompleted {
            student_id: student,
            course: summary,
        }])
        .await;
}

#[tokio::test]
async fn sink_failures_are_swallowed() {
    let mut activity = MockActivityLogSink::new();
    activity
        .expect_append()
        .times(1)
        .returning(|_| Err(EventSinkError::write("disk full")));

    let runner = SideEffectRunner::new(SideEffectPorts {
        activity: Arc::new(activity),
        ..ports()
    });

    runner
        .run(vec![SideEffect::RecordActivity(NewActivity::new(
            UserId::random(),
            ActivityType::CourseCompleted,
            json!({}),
        ))])
        .await;
}

#[tokio::test]
async fn dispatch_failures_are_swallowed() {
    let mut dispatcher = MockTaskDispatcher::new();
    dispatcher
        .expect_dispatch()
        .times(1)
        .returning(|_| Err(TaskDispatchError::unavailable("runtime shutting down")));

    let runner = SideEffectRunner::new(SideEffectPorts {
        dispatcher: Arc::new(dispatcher),
        ..ports()
    });

    runner
        .run(vec![SideEffect::SendEmail(OutgoingEmail {
            to: "ada@example.com".to_owned(),
            subject: "Hello".to_owned(),
            html: "<p>Hi</p>".to_owned(),
        })])
        .await;
}

#[tokio::test]
async fn issuance_without_issuer_is_skipped() {
    let mut dispatcher = MockTaskDispatcher::new();
    dispatcher.expect_dispatch().never();

    let runner = SideEffectRunner::new(SideEffectPorts {
        dispatcher: Arc::new(dispatcher),
        ..ports()
    });

    runner
        .run(vec![SideEffect::IssueCertificate {
            user_id: UserId::random(),
            enrollment_id: EnrollmentId::random(),
        }])
        .await;
}

#[rstest]
#[case(Error::render_failed("renderer offline"))]
#[case(Error::invalid_state("course not completed"))]
#[tokio::test]
async fn issuance_calls_the_issuer_and_swallows_errors(#[case] failure: Error) {
    let user_id = UserId::random();
    let enrollment_id = EnrollmentId::random();
    let mut issuer = MockCertificateCommand::new();
    issuer
        .expect_issue_certificate()
        .withf(move |user, enrollment| *user == user_id && *enrollment == enrollment_id)
        .times(1)
        .return_once(move |_, _| Err(failure));

    let runner = SideEffectRunner::new(ports()).with_issuer(Arc::new(issuer));

    runner
        .run(vec![SideEffect::IssueCertificate {
            user_id,
            enrollment_id,
        }])
        .await;
}

#[rstest]
fn notification_carries_course_fields() {
    let instructor = UserId::random();
    let summary = course(instructor);
    let notification = course_completed_notification(UserId::random(), "Grace", &summary);

    assert_eq!(notification.recipient_id, instructor);
    assert_eq!(notification.content, "Grace completed Rust Basics");
    assert_eq!(notification.metadata["courseSlug"], "rust-basics");
}
