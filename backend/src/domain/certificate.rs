//! Course completion certificates.
//!
//! A certificate is issued once per completed enrollment. Its display fields
//! are captured at issuance so later renames of the learner or the course do
//! not change an issued document; regeneration renders from this snapshot.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{CertificateId, CourseId, EnrollmentId, UserId};

/// Prefix shared by every certificate code.
pub const CERTIFICATE_CODE_PREFIX: &str = "CERT-";
/// Number of random characters after the prefix.
pub const CERTIFICATE_CODE_LENGTH: usize = 12;
/// Uppercase alphabet without look-alike characters (no `0`, `O`, `1`, `I`).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Human-shareable, globally unique certificate code, e.g. `CERT-7QK2M9XH4RTA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CertificateCode(String);

/// Validation error for [`CertificateCode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("certificate code must be CERT- followed by 12 unambiguous characters")]
pub struct CertificateCodeError;

impl CertificateCode {
    /// Draw a fresh random code. Thirty-two symbols over twelve positions
    /// give a 2^60 keyspace.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let suffix: String = (0..CERTIFICATE_CODE_LENGTH)
            .map(|_| {
                let index = rng.gen_range(0..CODE_ALPHABET.len());
                char::from(CODE_ALPHABET.get(index).copied().unwrap_or(b'A'))
            })
            .collect();
        Self(format!("{CERTIFICATE_CODE_PREFIX}{suffix}"))
    }

    /// Parse a code supplied by a caller. Lowercase input is accepted.
    pub fn parse(raw: &str) -> Result<Self, CertificateCodeError> {
        let normalised = raw.trim().to_ascii_uppercase();
        let suffix = normalised
            .strip_prefix(CERTIFICATE_CODE_PREFIX)
            .ok_or(CertificateCodeError)?;
        let well_formed = suffix.len() == CERTIFICATE_CODE_LENGTH
            && suffix.bytes().all(|byte| CODE_ALPHABET.contains(&byte));
        if !well_formed {
            return Err(CertificateCodeError);
        }
        Ok(Self(normalised))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Deterministic storage path of the rendered document.
    pub fn document_path(&self) -> String {
        format!("certificates/{}.pdf", self.0)
    }
}

impl fmt::Display for CertificateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CertificateCode {
    type Error = CertificateCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CertificateCode> for String {
    fn from(value: CertificateCode) -> Self {
        value.0
    }
}

/// Display fields captured when a certificate is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSnapshot {
    pub student_name: String,
    pub student_email: String,
    pub course_title: String,
    pub completed_at: DateTime<Utc>,
}

/// An issued certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: CertificateId,
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub code: CertificateCode,
    pub document_ref: String,
    pub snapshot: CertificateSnapshot,
    pub issued_at: DateTime<Utc>,
}

/// Fields handed to the document renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateDocument {
    pub code: String,
    pub student_name: String,
    pub course_title: String,
    pub completion_date: String,
}

impl CertificateDocument {
    /// Build renderer input from a code and snapshot.
    pub fn from_snapshot(code: &CertificateCode, snapshot: &CertificateSnapshot) -> Self {
        Self {
            code: code.as_str().to_owned(),
            student_name: snapshot.student_name.clone(),
            course_title: snapshot.course_title.clone(),
            completion_date: format_long_date(snapshot.completed_at),
        }
    }
}

/// Public verification view of a certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateVerification {
    #[schema(example = "CERT-7QK2M9XH4RTA")]
    pub code: String,
    pub student_name: String,
    pub course_title: String,
    #[schema(example = "16 October 2026")]
    pub completion_date: String,
    pub completed_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
}

impl From<&Certificate> for CertificateVerification {
    fn from(value: &Certificate) -> Self {
        Self {
            code: value.code.as_str().to_owned(),
            student_name: value.snapshot.student_name.clone(),
            course_title: value.snapshot.course_title.clone(),
            completion_date: format_long_date(value.snapshot.completed_at),
            completed_at: value.snapshot.completed_at,
            issued_at: value.issued_at,
        }
    }
}

/// Long-form English date, e.g. "16 October 2026".
pub fn format_long_date(at: DateTime<Utc>) -> String {
    at.format("%-d %B %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rstest::rstest;

    #[rstest]
    fn generated_codes_are_well_formed() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..64 {
            let code = CertificateCode::generate(&mut rng);
            assert_eq!(CertificateCode::parse(code.as_str()), Ok(code.clone()));
            assert_eq!(
                code.as_str().len(),
                CERTIFICATE_CODE_PREFIX.len() + CERTIFICATE_CODE_LENGTH
            );
        }
    }

    #[rstest]
    fn generated_codes_differ() {
        let mut rng = SmallRng::seed_from_u64(11);
        let first = CertificateCode::generate(&mut rng);
        let second = CertificateCode::generate(&mut rng);
        assert_ne!(first, second);
    }

    #[rstest]
    #[case("CERT-ABC")]
    #[case("CRT-ABCDEFGHJKLM")]
    #[case("CERT-ABCDEFGHJKL0")]
    #[case("")]
    fn malformed_codes_are_rejected(#[case] raw: &str) {
        assert_eq!(CertificateCode::parse(raw), Err(CertificateCodeError));
    }

    #[rstest]
    fn parse_normalises_case() {
        let code = CertificateCode::parse(" cert-abcdefghjklm ").expect("valid code");
        assert_eq!(code.as_str(), "CERT-ABCDEFGHJKLM");
        assert_eq!(code.document_path(), "certificates/CERT-ABCDEFGHJKLM.pdf");
    }

    #[rstest]
    #[case(2026, 10, 16, "16 October 2026")]
    #[case(2025, 1, 3, "3 January 2025")]
    fn long_dates_use_day_month_year(
        #[case] year: i32,
        #[case] month: u32,
        #[case] day: u32,
        #[case] expected: &str,
    ) {
        let at = Utc
            .with_ymd_and_hms(year, month, day, 9, 30, 0)
            .single()
            .expect("valid date");
        assert_eq!(format_long_date(at), expected);
    }
}
