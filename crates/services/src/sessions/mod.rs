mod plan;
mod progress;
mod queries;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use plan::{DEFAULT_NEW_SHARE_PERCENT, SessionComposer, SessionPlan};
pub use progress::{SessionProgress, SessionScore};
pub use queries::{SessionRequest, compose_session};
pub use service::{SessionAnswer, TestSession};
pub use workflow::{SessionAnswerResult, SessionLoopService};
