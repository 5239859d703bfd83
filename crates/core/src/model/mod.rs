mod filter;
mod ids;
mod progress;
mod question;
mod tag;

pub use filter::{ProgressFilter, QuestionFilter};
pub use ids::{ParseIdError, ProgressId, QuestionId, UserId};
pub use progress::{
    DEFAULT_DIFFICULTY_RATING, MAX_DIFFICULTY_RATING, MAX_MASTERY, MIN_DIFFICULTY_RATING,
    Progress, ProgressDraft, ProgressError, ProgressStats, ProgressUpdate,
};
pub use question::{MIN_OPTIONS, Question, QuestionDraft, QuestionError, ValidatedQuestion};
pub use tag::{Subject, TagError, TagName};
