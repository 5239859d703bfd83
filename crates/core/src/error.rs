use thiserror::Error;

use crate::model::{ParseIdError, ProgressError, QuestionError, TagError};
use crate::scheduler::SchedulerError;

/// Umbrella error for callers that do not care which domain check failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Id(#[from] ParseIdError),
    #[error(transparent)]
    Tag(#[from] TagError),
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
