use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::tag::{Subject, TagError, TagName};

/// Fewest answer options a multiple-choice question may have.
pub const MIN_OPTIONS: usize = 2;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,
    #[error("a question needs at least {MIN_OPTIONS} options, got {count}")]
    TooFewOptions { count: usize },
    #[error("option {index} is empty")]
    EmptyOption { index: usize },
    #[error("correct answer index {index} is out of range for {len} options")]
    CorrectAnswerOutOfRange { index: usize, len: usize },
    #[error("choice {index} is out of range for {len} options")]
    ChoiceOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Label(#[from] TagError),
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Unvalidated question input, as typed by an author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: Option<String>,
    pub subject: Option<String>,
    pub tags: Vec<String>,
}

impl QuestionDraft {
    /// Validate the draft into a question that only lacks a store-assigned id.
    ///
    /// Text and options are trimmed; a blank explanation or subject is treated as absent.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank, there are fewer than two options,
    /// an option is blank, the correct answer index is out of range, or a tag is blank.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedQuestion, QuestionError> {
        let text = self.text.trim().to_owned();
        let options = self
            .options
            .into_iter()
            .map(|o| o.trim().to_owned())
            .collect::<Vec<_>>();
        let subject = self
            .subject
            .filter(|s| !s.trim().is_empty())
            .map(Subject::new)
            .transpose()?;
        let tags = self
            .tags
            .into_iter()
            .map(TagName::new)
            .collect::<Result<BTreeSet<_>, _>>()?;
        let explanation = self
            .explanation
            .map(|e| e.trim().to_owned())
            .filter(|e| !e.is_empty());

        check_shape(&text, &options, self.correct_answer)?;

        Ok(ValidatedQuestion {
            text,
            options,
            correct_answer: self.correct_answer,
            explanation,
            subject,
            tags,
            created_at: now,
        })
    }
}

fn check_shape(text: &str, options: &[String], correct_answer: usize) -> Result<(), QuestionError> {
    if text.trim().is_empty() {
        return Err(QuestionError::EmptyText);
    }
    if options.len() < MIN_OPTIONS {
        return Err(QuestionError::TooFewOptions {
            count: options.len(),
        });
    }
    if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
        return Err(QuestionError::EmptyOption { index });
    }
    if correct_answer >= options.len() {
        return Err(QuestionError::CorrectAnswerOutOfRange {
            index: correct_answer,
            len: options.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: Option<String>,
    pub subject: Option<Subject>,
    pub tags: BTreeSet<TagName>,
    pub created_at: DateTime<Utc>,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            text: self.text,
            options: self.options,
            correct_answer: self.correct_answer,
            explanation: self.explanation,
            subject: self.subject,
            tags: self.tags,
            created_at: self.created_at,
        }
    }
}

/// A stored multiple-choice question.
///
/// Immutable once created; `correct_answer` always indexes into `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
    correct_answer: usize,
    explanation: Option<String>,
    subject: Option<Subject>,
    tags: BTreeSet<TagName>,
    created_at: DateTime<Utc>,
}

impl Question {
    /// Rehydrate a question loaded from storage, re-checking its invariants.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the persisted record is malformed.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: QuestionId,
        text: String,
        options: Vec<String>,
        correct_answer: usize,
        explanation: Option<String>,
        subject: Option<Subject>,
        tags: BTreeSet<TagName>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, QuestionError> {
        check_shape(&text, &options, correct_answer)?;
        Ok(Self {
            id,
            text,
            options,
            correct_answer,
            explanation,
            subject,
            tags,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> usize {
        self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    #[must_use]
    pub fn tags(&self) -> &BTreeSet<TagName> {
        &self.tags
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns whether `choice` is the correct option.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::ChoiceOutOfRange` if `choice` does not index an option.
    pub fn is_correct(&self, choice: usize) -> Result<bool, QuestionError> {
        if choice >= self.options.len() {
            return Err(QuestionError::ChoiceOutOfRange {
                index: choice,
                len: self.options.len(),
            });
        }
        Ok(choice == self.correct_answer)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn draft() -> QuestionDraft {
        QuestionDraft {
            text: "What is 2 + 2?".into(),
            options: vec!["3".into(), "4".into(), "5".into()],
            correct_answer: 1,
            explanation: Some("  basic arithmetic ".into()),
            subject: Some("Math".into()),
            tags: vec!["arithmetic".into(), "easy".into(), "arithmetic".into()],
        }
    }

    #[test]
    fn valid_draft_validates_and_assigns_id() {
        let question = draft()
            .validate(fixed_now())
            .unwrap()
            .assign_id(QuestionId::new("q1").unwrap());

        assert_eq!(question.id().as_str(), "q1");
        assert_eq!(question.options().len(), 3);
        assert_eq!(question.explanation(), Some("basic arithmetic"));
        assert_eq!(question.subject().map(Subject::as_str), Some("Math"));
        assert_eq!(question.tags().len(), 2);
    }

    #[test]
    fn blank_text_is_rejected() {
        let mut d = draft();
        d.text = "  ".into();
        assert_eq!(d.validate(fixed_now()).unwrap_err(), QuestionError::EmptyText);
    }

    #[test]
    fn single_option_is_rejected() {
        let mut d = draft();
        d.options = vec!["only".into()];
        d.correct_answer = 0;
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            QuestionError::TooFewOptions { count: 1 }
        );
    }

    #[test]
    fn blank_option_is_rejected() {
        let mut d = draft();
        d.options[2] = " ".into();
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            QuestionError::EmptyOption { index: 2 }
        );
    }

    #[test]
    fn correct_answer_out_of_range_is_rejected() {
        let mut d = draft();
        d.correct_answer = 3;
        assert_eq!(
            d.validate(fixed_now()).unwrap_err(),
            QuestionError::CorrectAnswerOutOfRange { index: 3, len: 3 }
        );
    }

    #[test]
    fn blank_subject_is_treated_as_absent() {
        let mut d = draft();
        d.subject = Some("   ".into());
        let validated = d.validate(fixed_now()).unwrap();
        assert!(validated.subject.is_none());
    }

    #[test]
    fn blank_tag_is_rejected() {
        let mut d = draft();
        d.tags.push(String::new());
        assert!(matches!(
            d.validate(fixed_now()).unwrap_err(),
            QuestionError::Label(TagError::EmptyName)
        ));
    }

    #[test]
    fn is_correct_checks_range() {
        let question = draft()
            .validate(fixed_now())
            .unwrap()
            .assign_id(QuestionId::new("q1").unwrap());
        assert!(question.is_correct(1).unwrap());
        assert!(!question.is_correct(0).unwrap());
        assert_eq!(
            question.is_correct(7).unwrap_err(),
            QuestionError::ChoiceOutOfRange { index: 7, len: 3 }
        );
    }

    #[test]
    fn from_persisted_rejects_corrupt_index() {
        let err = Question::from_persisted(
            QuestionId::new("q1").unwrap(),
            "Q".into(),
            vec!["a".into(), "b".into()],
            5,
            None,
            None,
            BTreeSet::new(),
            fixed_now(),
        )
        .unwrap_err();
        assert!(matches!(err, QuestionError::CorrectAnswerOutOfRange { .. }));
    }
}
