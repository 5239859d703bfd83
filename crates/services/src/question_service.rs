use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use quiz_core::model::{Question, QuestionDraft, QuestionFilter, QuestionId, Subject, TagName};
use storage::repository::QuestionRepository;

use crate::Clock;
use crate::error::QuestionServiceError;

/// Sorted, de-duplicated labels across the whole question bank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub subjects: Vec<Subject>,
    pub tags: Vec<TagName>,
}

/// Orchestrates question authoring and lookup.
#[derive(Clone)]
pub struct QuestionService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
}

impl QuestionService {
    #[must_use]
    pub fn new(clock: Clock, questions: Arc<dyn QuestionRepository>) -> Self {
        Self { clock, questions }
    }

    /// Validate a draft and persist it.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Question` for validation failures.
    /// Returns `QuestionServiceError::Storage` if persistence fails.
    pub async fn add_question(&self, draft: QuestionDraft) -> Result<Question, QuestionServiceError> {
        let validated = draft.validate(self.clock.now())?;
        let question = self.questions.create_question(validated).await?;
        tracing::info!(
            question_id = %question.id(),
            subject = question.subject().map(Subject::as_str),
            tags = question.tags().len(),
            "question added"
        );
        Ok(question)
    }

    /// Fetch a question by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) if the question does not exist.
    pub async fn get_question(&self, id: &QuestionId) -> Result<Question, QuestionServiceError> {
        Ok(self.questions.get_question(id).await?)
    }

    /// List questions matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if repository access fails.
    pub async fn list_questions(
        &self,
        filter: &QuestionFilter,
    ) -> Result<Vec<Question>, QuestionServiceError> {
        Ok(self.questions.list_questions(filter).await?)
    }

    /// Collect every subject and tag in use.
    ///
    /// # Errors
    ///
    /// Returns `QuestionServiceError::Storage` if repository access fails.
    pub async fn catalog(&self) -> Result<Catalog, QuestionServiceError> {
        let questions = self.questions.list_questions(&QuestionFilter::all()).await?;

        let mut subjects = BTreeSet::new();
        let mut tags = BTreeSet::new();
        for question in &questions {
            if let Some(subject) = question.subject() {
                subjects.insert(subject.clone());
            }
            tags.extend(question.tags().iter().cloned());
        }

        Ok(Catalog {
            subjects: subjects.into_iter().collect(),
            tags: tags.into_iter().collect(),
        })
    }
}
