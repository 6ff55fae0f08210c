//! Strongly typed UUID identifiers for learning-platform entities.
//!
//! Each identifier wraps a [`Uuid`] so a lesson id can never be passed where
//! an enrollment id is expected. Identifiers serialise as plain UUID strings.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned when an identifier cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    /// The raw value was empty or only whitespace.
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },
    /// The raw value was not a UUID.
    #[error("{kind} must be a valid UUID")]
    Invalid { kind: &'static str },
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Parse an identifier from its string form.
            pub fn new(raw: impl AsRef<str>) -> Result<Self, IdParseError> {
                let raw = raw.as_ref();
                if raw.trim().is_empty() {
                    return Err(IdParseError::Empty { kind: $kind });
                }
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|_| IdParseError::Invalid { kind: $kind })
            }

            /// Wrap an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Borrow the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

uuid_id!(
    /// Stable user identifier.
    UserId,
    "user id"
);
uuid_id!(
    /// Course identifier.
    CourseId,
    "course id"
);
uuid_id!(
    /// Course module identifier.
    ModuleId,
    "module id"
);
uuid_id!(
    /// Lesson identifier.
    LessonId,
    "lesson id"
);
uuid_id!(
    /// Enrollment identifier; one enrollment exists per (user, course).
    EnrollmentId,
    "enrollment id"
);
uuid_id!(
    /// Certificate row identifier.
    CertificateId,
    "certificate id"
);
