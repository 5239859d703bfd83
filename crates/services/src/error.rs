//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{ProgressError, QuestionError};
use quiz_core::scheduler::SchedulerError;
use storage::repository::StorageError;

/// Errors emitted by `AnswerService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AnswerServiceError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuestionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionServiceError {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by session composition and the session loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already completed")]
    Completed,
    #[error("new question share must be within 0..=100 percent, got {0}")]
    NewShareOutOfRange(u8),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Answer(#[from] AnswerServiceError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
