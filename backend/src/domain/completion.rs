//! Course completion detection.
//!
//! Detection compares the enrollment state read by the successful
//! compare-and-swap write with the state it wrote. Because that write is
//! conditioned on the exact prior revision, at most one writer can observe
//! the transition to 100 for an enrollment.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CourseId, Enrollment, EnrollmentId, UserId};

/// When certificates are issued automatically after a course completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Issue as soon as progress reaches 100.
    #[default]
    OnFullProgress,
    /// Issue only once the learner has passed the course's final quiz.
    /// Courses without a final quiz behave like [`Self::OnFullProgress`].
    RequireFinalQuiz,
    /// Never issue automatically; learners request certificates explicitly.
    Manual,
}

impl CompletionPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnFullProgress => "on_full_progress",
            Self::RequireFinalQuiz => "require_final_quiz",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for CompletionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for an unknown policy name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown completion policy `{0}`; expected on_full_progress, require_final_quiz or manual")]
pub struct ParseCompletionPolicyError(pub String);

impl FromStr for CompletionPolicy {
    type Err = ParseCompletionPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "on_full_progress" => Ok(Self::OnFullProgress),
            "require_final_quiz" => Ok(Self::RequireFinalQuiz),
            "manual" => Ok(Self::Manual),
            _ => Err(ParseCompletionPolicyError(s.to_owned())),
        }
    }
}

/// Outcome of the final quiz check for a learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalQuizStatus {
    /// The course has no quiz flagged as final.
    NoFinalQuiz,
    /// The learner has at least one passing attempt.
    Passed,
    /// The course has a final quiz the learner has not passed.
    NotPassed,
}

/// Event produced when an enrollment first reaches full progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseCompleted {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub completed_at: DateTime<Utc>,
}

/// Detect the transition to a completed course.
///
/// Fires iff `updated` is at 100 percent, carries a completion timestamp,
/// and `prior` had none.
///
/// # Examples
/// ```
/// use backend::domain::{detect_completion, Enrollment};
///
/// fn fired(prior: &Enrollment, updated: &Enrollment) -> bool {
///     detect_completion(prior, updated).is_some()
/// }
/// ```
pub fn detect_completion(prior: &Enrollment, updated: &Enrollment) -> Option<CourseCompleted> {
    if prior.completed_at.is_some() || !updated.progress_percent.is_complete() {
        return None;
    }
    updated.completed_at.map(|completed_at| CourseCompleted {
        enrollment_id: updated.id,
        user_id: updated.user_id,
        course_id: updated.course_id,
        completed_at,
    })
}

/// Whether a certificate should be issued automatically for a completion.
pub fn should_auto_issue(policy: CompletionPolicy, quiz: FinalQuizStatus) -> bool {
    match policy {
        CompletionPolicy::OnFullProgress => true,
        CompletionPolicy::RequireFinalQuiz => {
            matches!(quiz, FinalQuizStatus::Passed | FinalQuizStatus::NoFinalQuiz)
        }
        CompletionPolicy::Manual => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LessonId, ModuleId, ProgressPercent};
    use rstest::{fixture, rstest};

    #[fixture]
    fn prior() -> Enrollment {
        Enrollment {
            id: EnrollmentId::random(),
            user_id: UserId::random(),
            course_id: CourseId::random(),
            progress_percent: ProgressPercent::clamped(75),
            last_accessed_lesson_id: None,
            last_accessed_module_id: None,
            completed_at: None,
            revision: 3,
            enrolled_at: Utc::now(),
        }
    }

    fn advance(enrollment: &Enrollment, percent: u8) -> Enrollment {
        enrollment.with_progress(
            ProgressPercent::clamped(i64::from(percent)),
            LessonId::random(),
            ModuleId::random(),
            Utc::now(),
        )
    }

    #[rstest]
    fn fires_on_first_transition_to_full(prior: Enrollment) {
        let updated = advance(&prior, 100);
        let event = detect_completion(&prior, &updated).expect("completion fires");
        assert_eq!(event.enrollment_id, prior.id);
        assert_eq!(Some(event.completed_at), updated.completed_at);
    }

    #[rstest]
    fn does_not_fire_below_full(prior: Enrollment) {
        let updated = advance(&prior, 99);
        assert!(detect_completion(&prior, &updated).is_none());
    }

    #[rstest]
    fn does_not_fire_when_already_completed(prior: Enrollment) {
        let completed = advance(&prior, 100);
        let again = advance(&completed, 100);
        assert!(detect_completion(&completed, &again).is_none());
    }

    #[rstest]
    #[case(CompletionPolicy::OnFullProgress, FinalQuizStatus::NotPassed, true)]
    #[case(CompletionPolicy::RequireFinalQuiz, FinalQuizStatus::Passed, true)]
    #[case(CompletionPolicy::RequireFinalQuiz, FinalQuizStatus::NoFinalQuiz, true)]
    #[case(CompletionPolicy::RequireFinalQuiz, FinalQuizStatus::NotPassed, false)]
    #[case(CompletionPolicy::Manual, FinalQuizStatus::Passed, false)]
    fn auto_issue_follows_policy(
        #[case] policy: CompletionPolicy,
        #[case] quiz: FinalQuizStatus,
        #[case] expected: bool,
    ) {
        assert_eq!(should_auto_issue(policy, quiz), expected);
    }

    #[rstest]
    #[case("on_full_progress", CompletionPolicy::OnFullProgress)]
    #[case("require-final-quiz", CompletionPolicy::RequireFinalQuiz)]
    #[case("MANUAL", CompletionPolicy::Manual)]
    fn policy_parses_names(#[case] raw: &str, #[case] expected: CompletionPolicy) {
        assert_eq!(raw.parse::<CompletionPolicy>(), Ok(expected));
    }

    #[rstest]
    fn unknown_policy_is_rejected() {
        assert!("sometimes".parse::<CompletionPolicy>().is_err());
    }
}
