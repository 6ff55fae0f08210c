//! Tests for the domain error payload and its validation rules.

use super::*;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[fixture]
fn base_error() -> Error {
    Error::invalid_request("bad")
}

#[rstest]
#[case(Error::conflict("dup"), ErrorCode::Conflict)]
#[case(Error::invalid_state("course has no lessons"), ErrorCode::InvalidState)]
#[case(Error::render_failed("renderer down"), ErrorCode::RenderFailed)]
#[case(Error::storage_failed("disk full"), ErrorCode::StorageFailed)]
#[case(Error::forbidden("denied"), ErrorCode::Forbidden)]
fn constructors_set_codes(#[case] error: Error, #[case] code: ErrorCode) {
    assert_eq!(error.code(), code);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn try_with_trace_id_rejects_empty_values(base_error: Error) {
    let result = base_error.try_with_trace_id("   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyTraceId)));
}

#[rstest]
fn new_returns_none_when_trace_id_out_of_scope() {
    let error = Error::internal("boom");
    assert!(error.trace_id().is_none());
}

#[rstest]
#[case(Error::render_failed("x"), true)]
#[case(Error::storage_failed("x"), true)]
#[case(Error::service_unavailable("x"), true)]
#[case(Error::conflict("x"), false)]
#[case(Error::invalid_state("x"), false)]
fn retryable_codes_are_flagged(#[case] error: Error, #[case] expected: bool) {
    assert_eq!(error.is_retryable(), expected);
}

#[rstest]
#[tokio::test]
async fn new_captures_trace_id_in_scope(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id
        .parse()
        .expect("fixtures provide a valid UUID");
    let error = TraceId::scope(trace_id, async move { Error::internal("boom") }).await;

    assert_eq!(error.trace_id(), Some(expected_trace_id.as_str()));
}

#[rstest]
#[tokio::test]
async fn try_from_error_dto_clears_ambient_trace(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id
        .parse()
        .expect("fixtures provide a valid UUID");
    let dto = ErrorDto {
        code: ErrorCode::InvalidRequest,
        message: "bad".to_owned(),
        trace_id: None,
        details: None,
    };

    let error = TraceId::scope(trace_id, async move {
        Error::try_from(dto).expect("conversion succeeds for valid payload without trace")
    })
    .await;

    assert!(error.trace_id().is_none());
}

#[rstest]
fn serialises_to_camel_case_json(expected_trace_id: String) {
    let error = Error::conflict("lesson already completed")
        .with_trace_id(expected_trace_id.clone())
        .with_details(json!({ "code": "lesson_already_completed" }));

    let value = serde_json::to_value(&error).expect("error serialises");
    assert_eq!(value["code"], "conflict");
    assert_eq!(value["traceId"], expected_trace_id);
    assert_eq!(value["details"]["code"], "lesson_already_completed");

    let decoded: Error = serde_json::from_value(value).expect("error deserialises");
    assert_eq!(decoded, error);
}

#[rstest]
fn deserialising_blank_message_fails() {
    let result = serde_json::from_value::<Error>(json!({
        "code": "not_found",
        "message": "  ",
    }));
    assert!(result.is_err());
}
