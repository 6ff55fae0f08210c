//! Course structure used by progress tracking.
//!
//! Course authoring lives elsewhere; the pipeline only needs the ordered
//! outline (modules and their lessons) to count progress, plus the summary
//! fields shown in notifications and certificates.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{CourseId, LessonId, ModuleId, UserId};

/// URL-safe course identifier.
///
/// Slugs are trimmed, non-empty, and composed of lowercase ASCII letters,
/// digits, and hyphens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseSlug(String);

/// Validation error for [`CourseSlug`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CourseSlugError {
    #[error("course slug must not be empty")]
    Empty,
    #[error("course slug may only contain lowercase letters, digits, and hyphens")]
    InvalidCharacters,
}

impl CourseSlug {
    /// Validate and construct a slug.
    pub fn new(raw: impl Into<String>) -> Result<Self, CourseSlugError> {
        let raw = raw.into();
        if raw.is_empty() || raw.trim() != raw {
            return Err(CourseSlugError::Empty);
        }
        let allowed = raw
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-');
        if !allowed {
            return Err(CourseSlugError::InvalidCharacters);
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CourseSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CourseSlug {
    type Error = CourseSlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CourseSlug> for String {
    fn from(value: CourseSlug) -> Self {
        value.0
    }
}

/// Kind of content a lesson delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    Text,
    Video,
    Quiz,
}

impl LessonKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Video => "video",
            Self::Quiz => "quiz",
        }
    }

    /// Parse the stored representation of a lesson kind.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "text" => Some(Self::Text),
            "video" => Some(Self::Video),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }
}

/// Summary fields of a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub id: CourseId,
    pub slug: CourseSlug,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub instructor_id: UserId,
}

/// Lesson entry inside a module outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonOutline {
    pub id: LessonId,
    pub position: i32,
    pub kind: LessonKind,
    pub duration_seconds: i32,
}

/// Module entry inside a course outline; lessons are ordered by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutline {
    pub id: ModuleId,
    pub position: i32,
    pub lessons: Vec<LessonOutline>,
}

impl ModuleOutline {
    /// Sum of lesson durations in this module.
    pub fn duration_seconds(&self) -> i64 {
        self.lessons
            .iter()
            .map(|lesson| i64::from(lesson.duration_seconds))
            .sum()
    }
}

/// A course with its ordered modules and lessons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOutline {
    pub course: CourseSummary,
    pub modules: Vec<ModuleOutline>,
}

impl CourseOutline {
    /// All lesson ids of the course, in outline order.
    pub fn lesson_ids(&self) -> Vec<LessonId> {
        self.modules
            .iter()
            .flat_map(|module| module.lessons.iter().map(|lesson| lesson.id))
            .collect()
    }

    /// Number of lessons across every module.
    pub fn total_lessons(&self) -> usize {
        self.modules.iter().map(|module| module.lessons.len()).sum()
    }

    /// Sum of all lesson durations.
    pub fn total_duration_seconds(&self) -> i64 {
        self.modules.iter().map(ModuleOutline::duration_seconds).sum()
    }

    /// Module that owns `lesson_id`, if the lesson belongs to this course.
    pub fn module_of(&self, lesson_id: LessonId) -> Option<ModuleId> {
        self.modules
            .iter()
            .find(|module| module.lessons.iter().any(|lesson| lesson.id == lesson_id))
            .map(|module| module.id)
    }
}

/// A lesson resolved together with its module and owning course outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonContext {
    pub lesson_id: LessonId,
    pub module_id: ModuleId,
    pub outline: CourseOutline,
}
