//! Shared conversions between database column types and domain values.

use uuid::Uuid;

use crate::domain::{LessonId, ProgressPercent};

/// Cast database revision (i32) to domain revision (u32).
///
/// Revisions are always positive, enforced by a `CHECK` constraint.
#[expect(
    clippy::cast_sign_loss,
    reason = "revision is always non-negative in database"
)]
pub fn cast_revision(revision: i32) -> u32 {
    revision as u32
}

/// Cast domain revision (u32) to database revision (i32).
#[expect(
    clippy::cast_possible_wrap,
    reason = "revision values are always small positive integers"
)]
pub fn cast_revision_for_db(revision: u32) -> i32 {
    revision as i32
}

/// Stored percentage column to domain value.
pub fn percent_from_db(value: i16) -> ProgressPercent {
    ProgressPercent::clamped(i64::from(value))
}

/// Domain percentage to stored column value.
pub fn percent_for_db(percent: ProgressPercent) -> i16 {
    i16::from(percent.value())
}

/// Lesson ids as raw UUIDs for `IN` filters.
pub fn lesson_uuids(lesson_ids: &[LessonId]) -> Vec<Uuid> {
    lesson_ids.iter().map(|id| *id.as_uuid()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1)]
    #[case(42)]
    fn revisions_round_trip(#[case] revision: u32) {
        assert_eq!(cast_revision(cast_revision_for_db(revision)), revision);
    }

    #[rstest]
    #[case(-3, 0)]
    #[case(55, 55)]
    #[case(140, 100)]
    fn stored_percentages_are_clamped(#[case] raw: i16, #[case] expected: u8) {
        assert_eq!(percent_from_db(raw).value(), expected);
    }
}
