//! Tests for HTTP error mapping.
//!
//! Learners and the gateway rely on the status to decide whether to retry a
//! completion or a certificate claim, and on the body's trace id when
//! reporting a failure.

use super::*;
use crate::domain::Error;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use actix_web::ResponseError;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[fixture]
fn internal_error_case(expected_trace_id: String) -> Error {
    Error::internal("enrollment repository error: relation missing")
        .with_trace_id(expected_trace_id)
        .with_details(json!({"query": "update enrollments"}))
}

#[fixture]
fn invalid_request_case(expected_trace_id: String) -> Error {
    Error::invalid_request("lessonId must be a UUID")
        .with_trace_id(expected_trace_id)
        .with_details(json!({"field": "lessonId", "value": "abc", "code": "invalid_uuid"}))
}

#[rstest]
#[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case(Error::unauthorized("no identity"), StatusCode::UNAUTHORIZED)]
#[case(Error::forbidden("denied"), StatusCode::FORBIDDEN)]
#[case(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case(Error::conflict("lesson already completed"), StatusCode::CONFLICT)]
#[case(Error::invalid_state("course not completed"), StatusCode::UNPROCESSABLE_ENTITY)]
#[case(Error::render_failed("renderer down"), StatusCode::BAD_GATEWAY)]
#[case(Error::storage_failed("disk full"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::service_unavailable("db down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] err: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&err), status);
}

async fn assert_error_response(
    error: Error,
    expected_status: StatusCode,
    expected_trace_id: Option<&str>,
) -> Error {
    let response = ResponseError::error_response(&error);
    assert_eq!(response.status(), expected_status);

    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .or_else(|| response.headers().get("Trace-Id"));
    match expected_trace_id {
        Some(expected) => {
            let trace_id = header
                .expect("Trace-Id header is set by error_response")
                .to_str()
                .expect("Trace-Id not valid UTF-8");
            assert_eq!(trace_id, expected);
        }
        None => assert!(header.is_none(), "Trace-Id header should not be present"),
    }

    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");

    serde_json::from_slice(&bytes).expect("Error JSON deserialisation succeeds")
}

#[rstest]
#[actix_web::test]
async fn error_responses_include_trace_id_and_payloads(
    #[from(internal_error_case)] internal_error: Error,
    #[from(invalid_request_case)] invalid_request: Error,
    expected_trace_id: String,
) {
    let redacted = assert_error_response(
        internal_error,
        StatusCode::INTERNAL_SERVER_ERROR,
        Some(expected_trace_id.as_str()),
    )
    .await;
    assert_eq!(redacted.code(), ErrorCode::InternalError);
    assert_eq!(redacted.message(), "Internal server error");
    assert!(redacted.details().is_none());

    let payload = assert_error_response(
        invalid_request,
        StatusCode::BAD_REQUEST,
        Some(expected_trace_id.as_str()),
    )
    .await;
    assert_eq!(payload.code(), ErrorCode::InvalidRequest);
    assert_eq!(payload.message(), "lessonId must be a UUID");
    assert_eq!(
        payload.details(),
        Some(&json!({"field": "lessonId", "value": "abc", "code": "invalid_uuid"}))
    );
}

#[rstest]
#[actix_web::test]
async fn revision_conflict_details_reach_the_client() {
    let details = json!({"expectedRevision": 3, "actualRevision": 4, "code": "revision_mismatch"});
    let error = Error::conflict("enrollment was modified concurrently")
        .with_trace_id(TRACE_ID)
        .with_details(details.clone());

    let payload = assert_error_response(error, StatusCode::CONFLICT, Some(TRACE_ID)).await;

    assert_eq!(payload.code(), ErrorCode::Conflict);
    assert_eq!(payload.details(), Some(&details));
    assert!(!payload.is_retryable());
}

#[rstest]
#[case(Error::render_failed("certificate rendering timed out"))]
#[case(Error::storage_failed("certificate storage failed"))]
#[case(Error::service_unavailable("enrollment repository unavailable: pool"))]
fn retryable_failures_map_to_gateway_or_unavailable(#[case] error: Error) {
    assert!(error.is_retryable());
    assert!(ResponseError::status_code(&error).is_server_error());
    assert_ne!(
        ResponseError::status_code(&error),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[rstest]
#[actix_web::test]
async fn error_without_trace_id_omits_trace_header() {
    let error = Error::invalid_request("bad").with_details(json!({"field": "name"}));

    let payload = assert_error_response(error, StatusCode::BAD_REQUEST, None).await;
    assert_eq!(payload.code(), ErrorCode::InvalidRequest);
    assert_eq!(payload.message(), "bad");
    assert_eq!(payload.trace_id(), None);
    assert_eq!(payload.details(), Some(&json!({"field": "name"})));
}

#[rstest]
#[case(Error::internal("boom"), "Internal server error")]
#[case(Error::render_failed("renderer down"), "renderer down")]
#[case(Error::invalid_state("course not completed"), "course not completed")]
fn only_internal_errors_are_redacted(#[case] error: Error, #[case] expected: &str) {
    let error = error
        .with_trace_id(TRACE_ID)
        .with_details(json!({"secret": true}));

    let redacted = super::redact_if_internal(&error);

    assert_eq!(redacted.message(), expected);
    assert_eq!(redacted.trace_id(), Some(TRACE_ID));
}

#[test]
fn from_actix_error_is_redacted_internal_error() {
    use actix_web::error;

    let actix_err = error::ErrorBadRequest("boom");
    let err: Error = actix_err.into();

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.message(), "Internal server error");
    assert_eq!(err.trace_id(), None);
    assert_eq!(err.details(), None);
}
