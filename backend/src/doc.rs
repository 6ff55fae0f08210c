//! OpenAPI documentation configuration.
//!
//! This module defines the [`ApiDoc`] struct which generates the OpenAPI
//! document for the REST API. It registers:
//!
//! - **Paths**: lesson completion, course progress, certificate issuance and
//!   verification, the administrative reset and regeneration endpoints, and
//!   the health probes
//! - **Schemas**: request and response DTOs plus the domain wrappers
//!   ([`ErrorSchema`], [`ErrorCodeSchema`])
//! - **Security**: the identity headers injected by the authenticating gateway
//!
//! The generated document is served by Swagger UI in debug builds.

use crate::domain::CertificateVerification;
use crate::inbound::http::certificates::CertificateResponse;
use crate::inbound::http::identity::{USER_ID_HEADER, USER_ROLE_HEADER};
use crate::inbound::http::progress::{
    CompleteLessonRequest, CourseProgressResponse, EnrollmentProgressResponse,
    LessonCompletionResponse, ResetProgressResponse,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the gateway identity headers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "GatewayUser",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                USER_ID_HEADER,
                "UUID of the authenticated user, set by the gateway.",
            ))),
        );
        components.add_security_scheme(
            "GatewayRole",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                USER_ROLE_HEADER,
                "Role of the authenticated user: student, instructor or admin.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Learning progress API",
        description = "Lesson completion tracking, course progress and certificate issuance.",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0.html"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("GatewayUser" = [], "GatewayRole" = [])),
    paths(
        crate::inbound::http::progress::complete_lesson,
        crate::inbound::http::progress::get_course_progress,
        crate::inbound::http::progress::reset_course_progress,
        crate::inbound::http::certificates::issue_certificate,
        crate::inbound::http::certificates::regenerate_certificate,
        crate::inbound::http::certificates::list_certificates,
        crate::inbound::http::certificates::verify_certificate,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        CompleteLessonRequest,
        EnrollmentProgressResponse,
        LessonCompletionResponse,
        CourseProgressResponse,
        ResetProgressResponse,
        CertificateResponse,
        CertificateVerification,
    )),
    tags(
        (name = "progress", description = "Lesson completion and course progress"),
        (name = "certificates", description = "Certificate issuance and verification"),
        (name = "admin", description = "Administrative corrections"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated OpenAPI document.

    use super::*;
    use rstest::rstest;
    use utoipa::OpenApi;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // Note: utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";

    /// Assert that an Object schema contains a field with the given name.
    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[test]
    fn openapi_error_schema_has_required_fields() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let error_schema = schemas.get(ERROR_SCHEMA_NAME).expect("Error schema");

        assert_object_schema_has_field(error_schema, "code");
        assert_object_schema_has_field(error_schema, "message");
    }

    #[test]
    fn verification_schema_omits_the_student_email() {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let schema = schemas
            .get("CertificateVerification")
            .expect("verification schema");

        assert_object_schema_has_field(schema, "studentName");
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(!obj.properties.contains_key("studentEmail"));
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    #[case("/api/v1/courses/{slug}/lessons/{lesson_id}/complete")]
    #[case("/api/v1/courses/{slug}/progress")]
    #[case("/api/v1/admin/users/{user_id}/courses/{slug}/reset")]
    #[case("/api/v1/enrollments/{enrollment_id}/certificate")]
    #[case("/api/v1/admin/certificates/{certificate_id}/regenerate")]
    #[case("/api/v1/certificates")]
    #[case("/api/v1/certificates/verify/{code}")]
    #[case("/health/ready")]
    #[case("/health/live")]
    fn every_route_is_documented(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(
            doc.paths.paths.contains_key(path),
            "missing path {path}"
        );
    }

    #[test]
    fn gateway_headers_are_security_schemes() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("GatewayUser"));
        assert!(components.security_schemes.contains_key("GatewayRole"));
    }
}
