use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse {kind} from string: identifier must not be blank")]
pub struct ParseIdError {
    kind: &'static str,
}

impl ParseIdError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

// Store-assigned document ids are opaque strings; the only thing we can
// check locally is that they are not blank.
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new id from a non-blank string.
            ///
            /// # Errors
            ///
            /// Returns `ParseIdError` if the value is empty after trimming.
            pub fn new(value: impl Into<String>) -> Result<Self, ParseIdError> {
                let raw = value.into();
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        kind: stringify!($name),
                    });
                }
                Ok(Self(trimmed.to_owned()))
            }

            /// Generates a fresh random id.
            #[must_use]
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().simple().to_string())
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseIdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

string_id!(
    /// Unique identifier for a Question document.
    QuestionId
);

string_id!(
    /// Unique identifier for a Progress document.
    ProgressId
);

string_id!(
    /// Identifier of the learner answering questions.
    UserId
);

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_id_display() {
        let id = QuestionId::new("q-42").unwrap();
        assert_eq!(id.to_string(), "q-42");
    }

    #[test]
    fn question_id_from_str_trims() {
        let id: QuestionId = "  q-1 ".parse().unwrap();
        assert_eq!(id.as_str(), "q-1");
    }

    #[test]
    fn blank_id_is_rejected() {
        let err = "   ".parse::<UserId>().unwrap_err();
        assert_eq!(err.kind(), "UserId");
    }

    #[test]
    fn generated_ids_are_distinct() {
        assert_ne!(ProgressId::generate(), ProgressId::generate());
    }

    #[test]
    fn debug_names_the_kind() {
        let id = ProgressId::new("p1").unwrap();
        assert_eq!(format!("{id:?}"), "ProgressId(p1)");
    }
}
