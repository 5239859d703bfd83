#![forbid(unsafe_code)]

pub mod answer_service;
pub mod error;
pub mod question_service;
pub mod sessions;

pub use quiz_core::Clock;

pub use answer_service::{AnswerResult, AnswerService};
pub use error::{AnswerServiceError, QuestionServiceError, SessionError};
pub use question_service::{Catalog, QuestionService};

pub use sessions::{
    SessionAnswer, SessionAnswerResult, SessionComposer, SessionLoopService, SessionPlan,
    SessionRequest, SessionScore, TestSession, compose_session,
};
