//! Tests for the certificate handlers.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::test;
use mockable::Clock;
use rstest::{fixture, rstest};
use serde_json::Value;

use super::*;
use crate::domain::ports::{CertificateCommand, MockCertificateCommand};
use crate::domain::{CompletionPolicy, Error, ErrorCode, UserId, UserRole};
use crate::inbound::http::test_utils::{api_app, as_user};
use crate::test_support::{EnrolledLearner, StubDocumentRenderer, TestPipeline};

fn state_for(pipeline: &TestPipeline) -> HttpState {
    HttpState::from_services(pipeline.progress.clone(), pipeline.certificates.clone())
}

async fn finish_course(pipeline: &TestPipeline, learner: &EnrolledLearner) {
    for lesson in learner.lessons() {
        pipeline
            .complete(learner.student_id, lesson)
            .await
            .expect("completion");
    }
}

#[fixture]
fn manual() -> TestPipeline {
    TestPipeline::new(CompletionPolicy::Manual)
}

#[rstest]
#[actix_web::test]
async fn completed_learners_can_claim_their_certificate(manual: TestPipeline) {
    let learner = manual.enrolled_learner("rust-basics", &[1, 1]);
    finish_course(&manual, &learner).await;
    let app = test::init_service(api_app(state_for(&manual))).await;

    let uri = format!("/api/v1/enrollments/{}/certificate", learner.enrollment.id);
    let send = || {
        as_user(
            test::TestRequest::post().uri(&uri),
            learner.student_id,
            UserRole::Student,
        )
        .to_request()
    };
    let first: CertificateResponse = test::call_and_read_body_json(&app, send()).await;
    let second: CertificateResponse = test::call_and_read_body_json(&app, send()).await;

    assert!(first.code.starts_with("CERT-"));
    assert_eq!(first.enrollment_id, learner.enrollment.id.to_string());
    assert_eq!(first.student_name, "Ada Lovelace");
    assert_eq!(first.course_title, "Rust Basics");
    assert_eq!(first.id, second.id);
    assert_eq!(manual.renderer.calls(), 1);
}

#[rstest]
#[actix_web::test]
async fn unfinished_courses_are_unprocessable(manual: TestPipeline) {
    let learner = manual.enrolled_learner("rust-basics", &[2]);
    let app = test::init_service(api_app(state_for(&manual))).await;

    let uri = format!("/api/v1/enrollments/{}/certificate", learner.enrollment.id);
    let request = as_user(
        test::TestRequest::post().uri(&uri),
        learner.student_id,
        UserRole::Student,
    )
    .to_request();
    let response = test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Error = test::read_body_json(response).await;
    assert_eq!(body.code(), ErrorCode::InvalidState);
    assert!(manual.store.certificates().is_empty());
}

#[rstest]
#[actix_web::test]
async fn renderer_outage_is_a_bad_gateway() {
    let pipeline = TestPipeline::builder()
        .completion_policy(CompletionPolicy::Manual)
        .renderer(StubDocumentRenderer::failing())
        .build();
    let learner = pipeline.enrolled_learner("rust-basics", &[1]);
    finish_course(&pipeline, &learner).await;
    let app = test::init_service(api_app(state_for(&pipeline))).await;

    let uri = format!("/api/v1/enrollments/{}/certificate", learner.enrollment.id);
    let request = as_user(
        test::TestRequest::post().uri(&uri),
        learner.student_id,
        UserRole::Student,
    )
    .to_request();
    let response = test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Error = test::read_body_json(response).await;
    assert_eq!(body.code(), ErrorCode::RenderFailed);
}

#[rstest]
#[actix_web::test]
async fn listing_returns_the_callers_certificates(manual: TestPipeline) {
    let learner = manual.enrolled_learner("rust-basics", &[1]);
    finish_course(&manual, &learner).await;
    let issued = manual
        .certificates
        .issue_certificate(&learner.student_id, &learner.enrollment.id)
        .await
        .expect("issued");
    let app = test::init_service(api_app(state_for(&manual))).await;

    let request = as_user(
        test::TestRequest::get().uri("/api/v1/certificates"),
        learner.student_id,
        UserRole::Student,
    )
    .to_request();
    let response = test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("Cache-Control"));
    let body: Vec<CertificateResponse> = test::read_body_json(response).await;
    assert_eq!(body.len(), 1);
    assert_eq!(body[0].code, issued.code.as_str());

    let stranger = as_user(
        test::TestRequest::get().uri("/api/v1/certificates"),
        UserId::random(),
        UserRole::Student,
    )
    .to_request();
    let empty: Vec<CertificateResponse> = test::call_and_read_body_json(&app, stranger).await;
    assert!(empty.is_empty());
}

#[rstest]
#[actix_web::test]
async fn verification_is_public_and_case_insensitive(manual: TestPipeline) {
    let learner = manual.enrolled_learner("rust-basics", &[1]);
    finish_course(&manual, &learner).await;
    let issued = manual
        .certificates
        .issue_certificate(&learner.student_id, &learner.enrollment.id)
        .await
        .expect("issued");
    let app = test::init_service(api_app(state_for(&manual))).await;

    let uri = format!(
        "/api/v1/certificates/verify/{}",
        issued.code.as_str().to_ascii_lowercase()
    );
    let response = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("Cache-Control")
            .and_then(|value| value.to_str().ok()),
        Some("public, max-age=300")
    );
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["code"], issued.code.as_str());
    assert_eq!(body["studentName"], "Ada Lovelace");
    assert_eq!(
        body["completionDate"],
        crate::domain::format_long_date(manual.clock.utc())
    );
    assert!(body.get("studentEmail").is_none());
}

#[rstest]
#[case("/api/v1/certificates/verify/CERT-ZZZZZZZZZZZZ")]
#[case("/api/v1/certificates/verify/garbage")]
#[actix_web::test]
async fn unknown_codes_are_not_found(manual: TestPipeline, #[case] uri: &str) {
    let app = test::init_service(api_app(state_for(&manual))).await;

    let response = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[rstest]
#[case(UserRole::Student)]
#[case(UserRole::Instructor)]
#[actix_web::test]
async fn regeneration_requires_an_administrator(#[case] role: UserRole) {
    let mut command = MockCertificateCommand::new();
    command.expect_regenerate_certificate().never();
    let state = HttpState {
        certificates: Arc::new(command),
        ..HttpState::default()
    };
    let app = test::init_service(api_app(state)).await;

    let uri = format!(
        "/api/v1/admin/certificates/{}/regenerate",
        crate::domain::CertificateId::random()
    );
    let request = as_user(test::TestRequest::post().uri(&uri), UserId::random(), role)
        .to_request();
    let response = test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[rstest]
#[actix_web::test]
async fn administrators_regenerate_with_the_same_code(manual: TestPipeline) {
    let learner = manual.enrolled_learner("rust-basics", &[1]);
    finish_course(&manual, &learner).await;
    let issued = manual
        .certificates
        .issue_certificate(&learner.student_id, &learner.enrollment.id)
        .await
        .expect("issued");
    let app = test::init_service(api_app(state_for(&manual))).await;

    let uri = format!("/api/v1/admin/certificates/{}/regenerate", issued.id);
    let request = as_user(
        test::TestRequest::post().uri(&uri),
        UserId::random(),
        UserRole::Admin,
    )
    .to_request();
    let body: CertificateResponse = test::call_and_read_body_json(&app, request).await;

    assert_eq!(body.code, issued.code.as_str());
    assert_eq!(manual.renderer.calls(), 2);
}
