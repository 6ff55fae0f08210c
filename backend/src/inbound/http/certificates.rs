//! Certificate HTTP handlers.
//!
//! ```text
//! POST /api/v1/enrollments/{enrollment_id}/certificate
//! POST /api/v1/admin/certificates/{certificate_id}/regenerate
//! GET  /api/v1/certificates
//! GET  /api/v1/certificates/verify/{code}
//! ```
//!
//! Verification is public; every other route needs the gateway identity
//! headers. Regeneration is reserved for administrators.

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Certificate, CertificateId, CertificateVerification, EnrollmentId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::{private_no_cache_header, public_short_lived_header};
use crate::inbound::http::identity::AuthenticatedActor;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_id};

const ENROLLMENT_ID: FieldName = FieldName::new("enrollmentId");
const CERTIFICATE_ID: FieldName = FieldName::new("certificateId");

/// Certificate as shown to its owner.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResponse {
    pub id: String,
    pub enrollment_id: String,
    pub course_id: String,
    #[schema(example = "CERT-7KQ2M9XH4PWD")]
    pub code: String,
    /// Storage reference of the rendered document.
    pub document_ref: String,
    pub student_name: String,
    pub course_title: String,
    pub completed_at: String,
    pub issued_at: String,
}

impl From<Certificate> for CertificateResponse {
    fn from(value: Certificate) -> Self {
        Self {
            id: value.id.to_string(),
            enrollment_id: value.enrollment_id.to_string(),
            course_id: value.course_id.to_string(),
            code: value.code.as_str().to_owned(),
            document_ref: value.document_ref,
            student_name: value.snapshot.student_name,
            course_title: value.snapshot.course_title,
            completed_at: value.snapshot.completed_at.to_rfc3339(),
            issued_at: value.issued_at.to_rfc3339(),
        }
    }
}

/// Issue the certificate of one of the caller's completed enrollments.
///
/// Repeated calls return the certificate issued first.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/{enrollment_id}/certificate",
    params(("enrollment_id" = String, Path, description = "Enrollment UUID")),
    responses(
        (status = 200, description = "Issued certificate", body = CertificateResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Enrollment belongs to another user", body = ErrorSchema),
        (status = 404, description = "Enrollment not found", body = ErrorSchema),
        (status = 409, description = "No unique code could be allocated", body = ErrorSchema),
        (status = 422, description = "Course not completed", body = ErrorSchema),
        (status = 502, description = "Rendering failed; retry later", body = ErrorSchema),
        (status = 503, description = "Storage unavailable; retry later", body = ErrorSchema)
    ),
    tags = ["certificates"],
    operation_id = "issueCertificate"
)]
#[post("/enrollments/{enrollment_id}/certificate")]
pub async fn issue_certificate(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
) -> ApiResult<web::Json<CertificateResponse>> {
    let enrollment_id: EnrollmentId = parse_id(&path.into_inner(), ENROLLMENT_ID)?;
    let certificate = state
        .certificates
        .issue_certificate(&actor.user_id(), &enrollment_id)
        .await?;
    Ok(web::Json(CertificateResponse::from(certificate)))
}

/// Re-render a certificate from its stored snapshot.
#[utoipa::path(
    post,
    path = "/api/v1/admin/certificates/{certificate_id}/regenerate",
    params(("certificate_id" = String, Path, description = "Certificate UUID")),
    responses(
        (status = 200, description = "Regenerated certificate", body = CertificateResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Administrator role required", body = ErrorSchema),
        (status = 404, description = "Certificate not found", body = ErrorSchema),
        (status = 502, description = "Rendering failed; retry later", body = ErrorSchema),
        (status = 503, description = "Storage unavailable; retry later", body = ErrorSchema)
    ),
    tags = ["admin"],
    operation_id = "regenerateCertificate"
)]
#[post("/admin/certificates/{certificate_id}/regenerate")]
pub async fn regenerate_certificate(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
    path: web::Path<String>,
) -> ApiResult<web::Json<CertificateResponse>> {
    actor.require_admin()?;
    let certificate_id: CertificateId = parse_id(&path.into_inner(), CERTIFICATE_ID)?;
    let certificate = state
        .certificates
        .regenerate_certificate(&certificate_id)
        .await?;
    Ok(web::Json(CertificateResponse::from(certificate)))
}

/// List the caller's certificates, most recent first.
#[utoipa::path(
    get,
    path = "/api/v1/certificates",
    responses(
        (
            status = 200,
            description = "Certificates of the caller",
            headers(("Cache-Control" = String, description = "Cache control header")),
            body = [CertificateResponse]
        ),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["certificates"],
    operation_id = "listCertificates"
)]
#[get("/certificates")]
pub async fn list_certificates(
    state: web::Data<HttpState>,
    actor: AuthenticatedActor,
) -> ApiResult<HttpResponse> {
    let certificates = state
        .certificates_query
        .list_certificates(&actor.user_id())
        .await?;
    let body: Vec<CertificateResponse> = certificates
        .into_iter()
        .map(CertificateResponse::from)
        .collect();
    Ok(HttpResponse::Ok()
        .insert_header(private_no_cache_header())
        .json(body))
}

/// Publicly verify a certificate code.
#[utoipa::path(
    get,
    path = "/api/v1/certificates/verify/{code}",
    params(("code" = String, Path, description = "Certificate code, case-insensitive")),
    security([]),
    responses(
        (
            status = 200,
            description = "Certificate is genuine",
            headers(("Cache-Control" = String, description = "Cache control header")),
            body = CertificateVerification
        ),
        (status = 404, description = "No certificate with this code", body = ErrorSchema)
    ),
    tags = ["certificates"],
    operation_id = "verifyCertificate"
)]
#[get("/certificates/verify/{code}")]
pub async fn verify_certificate(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let verification: CertificateVerification = state
        .certificates_query
        .verify_certificate(&path.into_inner())
        .await?;
    Ok(HttpResponse::Ok()
        .insert_header(public_short_lived_header())
        .json(verification))
}

#[cfg(test)]
#[path = "certificates_tests.rs"]
mod tests;
