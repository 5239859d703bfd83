use async_trait::async_trait;
use quiz_core::model::{
    Progress, ProgressDraft, ProgressFilter, ProgressId, ProgressUpdate, Question, QuestionFilter,
    QuestionId, ValidatedQuestion,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Question store contract.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Store a validated question and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn create_question(&self, question: ValidatedQuestion) -> Result<Question, StorageError>;

    /// Fetch a question by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_question(&self, id: &QuestionId) -> Result<Question, StorageError>;

    /// List questions matching the filter, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, StorageError>;
}

/// Progress store contract.
///
/// At most one record exists per (user, question) pair; `create_progress` enforces it.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// List progress records matching the filter.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be read.
    async fn list_progress(&self, filter: &ProgressFilter) -> Result<Vec<Progress>, StorageError>;

    /// Create a record and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the pair already has a record, or
    /// `StorageError::Serialization` if the draft violates record invariants.
    async fn create_progress(&self, draft: ProgressDraft) -> Result<Progress, StorageError>;

    /// Apply a partial update and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` for unknown ids, or
    /// `StorageError::Serialization` if the update violates record invariants.
    async fn update_progress(
        &self,
        id: &ProgressId,
        update: ProgressUpdate,
    ) -> Result<Progress, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<Vec<Question>>>,
    progress: Arc<Mutex<HashMap<ProgressId, Progress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            questions: Arc::new(Mutex::new(Vec::new())),
            progress: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

fn invalid<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn create_question(&self, question: ValidatedQuestion) -> Result<Question, StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let question = question.assign_id(QuestionId::generate());
        guard.push(question.clone());
        Ok(question)
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Question, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|q| q.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        // insertion order is creation order; newest first
        Ok(guard
            .iter()
            .rev()
            .filter(|q| filter.matches(q))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn list_progress(&self, filter: &ProgressFilter) -> Result<Vec<Progress>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut found: Vec<Progress> = guard
            .values()
            .filter(|p| filter.matches(p.user_id(), p.question_id()))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.stats().last_reviewed.cmp(&a.stats().last_reviewed));
        Ok(found)
    }

    async fn create_progress(&self, draft: ProgressDraft) -> Result<Progress, StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let taken = guard
            .values()
            .any(|p| p.user_id() == &draft.user_id && p.question_id() == &draft.question_id);
        if taken {
            return Err(StorageError::Conflict);
        }
        let progress = draft.assign_id(ProgressId::generate()).map_err(invalid)?;
        guard.insert(progress.id().clone(), progress.clone());
        Ok(progress)
    }

    async fn update_progress(
        &self,
        id: &ProgressId,
        update: ProgressUpdate,
    ) -> Result<Progress, StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let progress = guard.get_mut(id).ok_or(StorageError::NotFound)?;
        progress.apply_update(update).map_err(invalid)?;
        Ok(progress.clone())
    }
}

/// Aggregates question and progress repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            questions,
            progress,
        }
    }
}
