use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building category labels.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("tag name cannot be empty")]
    EmptyName,
    #[error("subject cannot be empty")]
    EmptySubject,
}

/// Validated tag name (trimmed, non-empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagName(String);

impl TagName {
    /// Create a validated tag name.
    ///
    /// # Errors
    ///
    /// Returns `TagError::EmptyName` if the name is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, TagError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TagError::EmptyName);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TagName {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TagName> for String {
    fn from(tag: TagName) -> Self {
        tag.0
    }
}

/// Single category label a question belongs to (trimmed, non-empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Subject(String);

impl Subject {
    /// Create a validated subject.
    ///
    /// # Errors
    ///
    /// Returns `TagError::EmptySubject` if the name is empty after trimming.
    pub fn new(value: impl Into<String>) -> Result<Self, TagError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TagError::EmptySubject);
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Subject {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Subject> for String {
    fn from(subject: Subject) -> Self {
        subject.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_name_trims_and_rejects_empty() {
        assert_eq!(TagName::new("  rust ").unwrap().as_str(), "rust");
        assert_eq!(TagName::new("   ").unwrap_err(), TagError::EmptyName);
    }

    #[test]
    fn subject_rejects_empty() {
        assert_eq!(Subject::new("").unwrap_err(), TagError::EmptySubject);
        assert_eq!(Subject::new("Biology").unwrap().to_string(), "Biology");
    }
}
