//! Certificate issuance through the wired services.

use rstest::rstest;

use backend::domain::ports::{CertificateCommand, CertificateQuery};
use backend::domain::{CompletionPolicy, ErrorCode, FinalQuizStatus, format_long_date};
use backend::test_support::{EnrolledLearner, StubDocumentRenderer, TestPipeline};

async fn finish(pipeline: &TestPipeline, learner: &EnrolledLearner) {
    for lesson_id in learner.lessons() {
        pipeline
            .complete(learner.student_id, lesson_id)
            .await
            .expect("completion succeeds");
    }
}

#[rstest]
#[tokio::test]
async fn unfinished_enrollments_get_no_certificate() {
    let pipeline = TestPipeline::new(CompletionPolicy::Manual);
    let learner = pipeline.enrolled_learner("rust-basics", &[2, 2]);
    pipeline
        .complete(learner.student_id, learner.lessons()[0])
        .await
        .expect("completion succeeds");

    let err = pipeline
        .certificates
        .issue_certificate(&learner.student_id, &learner.enrollment.id)
        .await
        .expect_err("course unfinished");

    assert_eq!(err.code(), ErrorCode::InvalidState);
    assert!(pipeline.store.certificates().is_empty());
    assert_eq!(pipeline.renderer.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn manual_policy_waits_for_the_learner_to_claim() {
    let pipeline = TestPipeline::new(CompletionPolicy::Manual);
    let learner = pipeline.enrolled_learner("rust-basics", &[1, 2]);

    finish(&pipeline, &learner).await;
    assert!(pipeline.store.certificates().is_empty());

    let certificate = pipeline
        .certificates
        .issue_certificate(&learner.student_id, &learner.enrollment.id)
        .await
        .expect("issued");
    let verification = pipeline
        .certificates
        .verify_certificate(certificate.code.as_str())
        .await
        .expect("verifiable");

    assert_eq!(verification.student_name, "Ada Lovelace");
    assert_eq!(verification.course_title, "Rust Basics");
    assert_eq!(
        verification.completion_date,
        format_long_date(certificate.snapshot.completed_at)
    );
    assert_eq!(pipeline.storage.len(), 1);
    assert_eq!(pipeline.email.sent().len(), 1);
}

#[rstest]
#[case(FinalQuizStatus::Passed, 1)]
#[case(FinalQuizStatus::NotPassed, 0)]
#[tokio::test]
async fn final_quiz_policy_gates_automatic_issuance(
    #[case] quiz: FinalQuizStatus,
    #[case] expected: usize,
) {
    let pipeline = TestPipeline::new(CompletionPolicy::RequireFinalQuiz);
    let learner = pipeline.enrolled_learner("rust-basics", &[2]);
    pipeline
        .store
        .set_final_quiz_status(learner.student_id, learner.outline.course.id, quiz);

    finish(&pipeline, &learner).await;

    assert_eq!(pipeline.store.certificates().len(), expected);
    let stored = pipeline
        .store
        .enrollment(&learner.enrollment.id)
        .expect("enrollment");
    assert!(stored.completed_at.is_some());
}

#[rstest]
#[tokio::test]
async fn final_quiz_policy_also_gates_explicit_claims() {
    let pipeline = TestPipeline::new(CompletionPolicy::RequireFinalQuiz);
    let learner = pipeline.enrolled_learner("rust-basics", &[2]);
    let course_id = learner.outline.course.id;
    pipeline
        .store
        .set_final_quiz_status(learner.student_id, course_id, FinalQuizStatus::NotPassed);
    finish(&pipeline, &learner).await;

    let err = pipeline
        .certificates
        .issue_certificate(&learner.student_id, &learner.enrollment.id)
        .await
        .expect_err("final quiz not passed");

    assert_eq!(err.code(), ErrorCode::InvalidState);
    assert!(pipeline.store.certificates().is_empty());
    assert_eq!(pipeline.renderer.calls(), 0);

    pipeline
        .store
        .set_final_quiz_status(learner.student_id, course_id, FinalQuizStatus::Passed);
    let certificate = pipeline
        .certificates
        .issue_certificate(&learner.student_id, &learner.enrollment.id)
        .await
        .expect("issued once the quiz is passed");
    assert_eq!(certificate.enrollment_id, learner.enrollment.id);
}

#[rstest]
#[tokio::test]
async fn renderer_outage_leaves_completion_intact_and_claimable() {
    let pipeline = TestPipeline::builder()
        .completion_policy(CompletionPolicy::OnFullProgress)
        .renderer(StubDocumentRenderer::failing())
        .build();
    let learner = pipeline.enrolled_learner("rust-basics", &[2]);

    finish(&pipeline, &learner).await;

    let stored = pipeline
        .store
        .enrollment(&learner.enrollment.id)
        .expect("enrollment");
    assert!(stored.progress_percent.is_complete());
    assert!(pipeline.store.certificates().is_empty());

    let err = pipeline
        .certificates
        .issue_certificate(&learner.student_id, &learner.enrollment.id)
        .await
        .expect_err("renderer still down");
    assert_eq!(err.code(), ErrorCode::RenderFailed);
    assert!(err.is_retryable());
}

#[rstest]
#[tokio::test]
async fn listing_shows_only_the_owners_certificates() {
    let pipeline = TestPipeline::new(CompletionPolicy::OnFullProgress);
    let first = pipeline.enrolled_learner("rust-basics", &[1]);
    let second = pipeline.enrolled_learner("rust-advanced", &[1]);
    finish(&pipeline, &first).await;
    finish(&pipeline, &second).await;

    let listed = pipeline
        .certificates
        .list_certificates(&first.student_id)
        .await
        .expect("listing");

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].enrollment_id, first.enrollment.id);
    assert_eq!(pipeline.store.certificates().len(), 2);
}
