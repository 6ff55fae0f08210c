//! PostgreSQL-backed `CertificateRepository` implementation.
//!
//! Snapshot fields live in dedicated columns rather than a JSON blob so
//! verification lookups never deserialise anything.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CertificateRepository, CertificateRepositoryError};
use crate::domain::{
    Certificate, CertificateCode, CertificateId, CertificateSnapshot, CourseId, EnrollmentId,
    UserId,
};

use super::diesel_basic_error_mapping::{
    map_basic_diesel_error, map_basic_pool_error, unique_violation_constraint,
};
use super::models::{CertificateRow, NewCertificateRow};
use super::pool::{DbPool, PoolError};
use super::schema::certificates;

const ENROLLMENT_CONSTRAINT: &str = "certificates_enrollment_id_key";
const CODE_CONSTRAINT: &str = "certificates_code_key";

/// Diesel-backed implementation of the certificate port.
#[derive(Clone)]
pub struct DieselCertificateRepository {
    pool: DbPool,
}

impl DieselCertificateRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> CertificateRepositoryError {
    map_basic_pool_error(error, |message| {
        CertificateRepositoryError::connection(message)
    })
}

fn map_diesel_error(error: diesel::result::Error) -> CertificateRepositoryError {
    if let Some(constraint) = unique_violation_constraint(&error) {
        if constraint.contains(ENROLLMENT_CONSTRAINT) {
            return CertificateRepositoryError::duplicate_enrollment();
        }
        if constraint.contains(CODE_CONSTRAINT) {
            return CertificateRepositoryError::duplicate_code();
        }
    }
    map_basic_diesel_error(
        error,
        CertificateRepositoryError::query,
        CertificateRepositoryError::connection,
    )
}

fn row_to_certificate(row: CertificateRow) -> Result<Certificate, CertificateRepositoryError> {
    let code = CertificateCode::parse(&row.code).map_err(|err| {
        CertificateRepositoryError::query(format!("invalid stored certificate code: {err}"))
    })?;
    Ok(Certificate {
        id: CertificateId::from_uuid(row.id),
        enrollment_id: EnrollmentId::from_uuid(row.enrollment_id),
        user_id: UserId::from_uuid(row.user_id),
        course_id: CourseId::from_uuid(row.course_id),
        code,
        document_ref: row.document_ref,
        snapshot: CertificateSnapshot {
            student_name: row.student_name,
            student_email: row.student_email,
            course_title: row.course_title,
            completed_at: row.completed_at,
        },
        issued_at: row.issued_at,
    })
}

#[async_trait]
impl CertificateRepository for DieselCertificateRepository {
    async fn find_by_id(
        &self,
        certificate_id: &CertificateId,
    ) -> Result<Option<Certificate>, CertificateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = certificates::table
            .filter(certificates::id.eq(certificate_id.as_uuid()))
            .select(CertificateRow::as_select())
            .first::<CertificateRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_certificate).transpose()
    }

    async fn find_by_enrollment(
        &self,
        enrollment_id: &EnrollmentId,
    ) -> Result<Option<Certificate>, CertificateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = certificates::table
            .filter(certificates::enrollment_id.eq(enrollment_id.as_uuid()))
            .select(CertificateRow::as_select())
            .first::<CertificateRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_certificate).transpose()
    }

    async fn find_by_code(
        &self,
        code: &CertificateCode,
    ) -> Result<Option<Certificate>, CertificateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = certificates::table
            .filter(certificates::code.eq(code.as_str()))
            .select(CertificateRow::as_select())
            .first::<CertificateRow>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        row.map(row_to_certificate).transpose()
    }

    async fn code_exists(&self, code: &CertificateCode) -> Result<bool, CertificateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::select(diesel::dsl::exists(
            certificates::table.filter(certificates::code.eq(code.as_str())),
        ))
        .get_result::<bool>(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn insert(&self, certificate: &Certificate) -> Result<(), CertificateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let snapshot = &certificate.snapshot;

        let new_row = NewCertificateRow {
            id: *certificate.id.as_uuid(),
            enrollment_id: *certificate.enrollment_id.as_uuid(),
            user_id: *certificate.user_id.as_uuid(),
            course_id: *certificate.course_id.as_uuid(),
            code: certificate.code.as_str(),
            document_ref: &certificate.document_ref,
            student_name: &snapshot.student_name,
            student_email: &snapshot.student_email,
            course_title: &snapshot.course_title,
            completed_at: snapshot.completed_at,
            issued_at: certificate.issued_at,
        };

        diesel::insert_into(certificates::table)
            .values(&new_row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn list_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Certificate>, CertificateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<CertificateRow> = certificates::table
            .filter(certificates::user_id.eq(user_id.as_uuid()))
            .order((certificates::issued_at.desc(), certificates::id.desc()))
            .select(CertificateRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter().map(row_to_certificate).collect()
    }

    async fn update_document_ref(
        &self,
        certificate_id: &CertificateId,
        document_ref: &str,
    ) -> Result<(), CertificateRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let updated = diesel::update(certificates::table)
            .filter(certificates::id.eq(certificate_id.as_uuid()))
            .set((
                certificates::document_ref.eq(document_ref),
                certificates::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        if updated == 0 {
            return Err(CertificateRepositoryError::query(format!(
                "certificate {certificate_id} not found"
            )));
        }
        Ok(())
    }
}
