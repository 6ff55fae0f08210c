//! Shared validation helpers for inbound HTTP adapters.
//!
//! Path segments and body fields are parsed into domain types here so
//! handlers only see validated values. Failures carry the offending field in
//! the error details.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::domain::{CourseSlug, Error};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidUuid,
    InvalidSlug,
    InvalidTimestamp,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidSlug => "invalid_slug",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(self) -> &'static str {
        self.0
    }
}

fn field_error(field: FieldName, message: String, code: ErrorCode, value: &str) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "value": value,
        "code": code.as_str(),
    }))
}

/// Parse a UUID-backed identifier such as `LessonId` or `EnrollmentId`.
pub(crate) fn parse_id<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value.parse().map_err(|_| {
        field_error(
            field,
            format!("{} must be a valid UUID", field.as_str()),
            ErrorCode::InvalidUuid,
            value,
        )
    })
}

pub(crate) fn parse_slug(value: &str, field: FieldName) -> Result<CourseSlug, Error> {
    CourseSlug::new(value).map_err(|err| {
        field_error(field, err.to_string(), ErrorCode::InvalidSlug, value)
    })
}

pub(crate) fn parse_optional_rfc3339_timestamp(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<DateTime<Utc>>, Error> {
    value
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|timestamp| timestamp.with_timezone(&Utc))
                .map_err(|_| {
                    field_error(
                        field,
                        format!("{} must be an RFC 3339 timestamp", field.as_str()),
                        ErrorCode::InvalidTimestamp,
                        raw,
                    )
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::{ErrorCode as DomainErrorCode, LessonId};

    const LESSON: FieldName = FieldName::new("lessonId");

    #[rstest]
    fn ids_parse_from_uuids() {
        let id: LessonId =
            parse_id("3fa85f64-5717-4562-b3fc-2c963f66afa6", LESSON).expect("valid id");
        assert_eq!(id.to_string(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    }

    #[rstest]
    #[case("")]
    #[case("lesson-1")]
    fn malformed_ids_name_the_field(#[case] raw: &str) {
        let err = parse_id::<LessonId>(raw, LESSON).expect_err("invalid id");
        assert_eq!(err.code(), DomainErrorCode::InvalidRequest);
        let details = err.details().expect("details");
        assert_eq!(details["field"], "lessonId");
        assert_eq!(details["code"], "invalid_uuid");
    }

    #[rstest]
    fn malformed_slugs_are_rejected() {
        let err = parse_slug("Not A Slug!", FieldName::new("slug")).expect_err("invalid slug");
        let details = err.details().expect("details");
        assert_eq!(details["code"], "invalid_slug");
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some("2026-01-15T09:30:00Z"), Some("2026-01-15T09:30:00+00:00"))]
    #[case(Some("2026-01-15T10:30:00+01:00"), Some("2026-01-15T09:30:00+00:00"))]
    fn timestamps_are_normalised_to_utc(
        #[case] raw: Option<&str>,
        #[case] expected: Option<&str>,
    ) {
        let parsed = parse_optional_rfc3339_timestamp(raw, FieldName::new("completedAt"))
            .expect("valid timestamp");
        assert_eq!(parsed.map(|at| at.to_rfc3339()).as_deref(), expected);
    }

    #[rstest]
    fn malformed_timestamps_are_rejected() {
        let err = parse_optional_rfc3339_timestamp(Some("yesterday"), FieldName::new("completedAt"))
            .expect_err("invalid timestamp");
        assert_eq!(err.details().expect("details")["code"], "invalid_timestamp");
    }
}
