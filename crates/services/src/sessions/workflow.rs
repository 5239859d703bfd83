use std::sync::Arc;

use rand::Rng;

use quiz_core::model::Progress;
use quiz_core::scheduler::Scheduler;
use storage::repository::{ProgressRepository, QuestionRepository, Storage};

use super::queries::{SessionQueries, SessionRequest};
use super::service::{SessionAnswer, TestSession};
use crate::Clock;
use crate::answer_service::AnswerService;
use crate::error::SessionError;

/// Result of answering a single question in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAnswerResult {
    pub answer: SessionAnswer,
    pub progress: Progress,
    pub is_complete: bool,
}

/// Orchestrates session start and persisted answering.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    answers: AnswerService,
    questions: Arc<dyn QuestionRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            answers: AnswerService::new().with_clock(clock),
            questions,
            progress,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.progress),
        )
    }

    /// Replace the interval table used when recording answers.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.answers = AnswerService::with_scheduler(scheduler).with_clock(self.clock);
        self
    }

    /// Start a new session, shuffling with the thread-local generator.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if a store read fails and
    /// `SessionError::Empty` if nothing matches the request.
    pub async fn start_session(&self, request: &SessionRequest) -> Result<TestSession, SessionError> {
        let candidates = SessionQueries::load_candidates(
            request,
            self.questions.as_ref(),
            self.progress.as_ref(),
        )
        .await?;
        let plan = SessionQueries::plan(request, candidates, self.clock.today(), &mut rand::rng())?;
        TestSession::new(request.user_id.clone(), plan.questions, self.clock.now())
    }

    /// Like [`SessionLoopService::start_session`], but an empty question pool
    /// yields `Ok(None)` instead of `SessionError::Empty`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if a store read fails.
    pub async fn try_start_session(
        &self,
        request: &SessionRequest,
    ) -> Result<Option<TestSession>, SessionError> {
        match self.start_session(request).await {
            Ok(session) => Ok(Some(session)),
            Err(SessionError::Empty) => {
                tracing::info!(user_id = %request.user_id, "no questions available for session");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Start a new session with a caller-supplied random source.
    ///
    /// # Errors
    ///
    /// See [`SessionLoopService::start_session`].
    pub async fn start_session_with_rng<R: Rng + ?Sized>(
        &self,
        request: &SessionRequest,
        rng: &mut R,
    ) -> Result<TestSession, SessionError> {
        let plan = SessionQueries::build_plan_from_storage(
            request,
            self.questions.as_ref(),
            self.progress.as_ref(),
            self.clock.today(),
            rng,
        )
        .await?;
        TestSession::new(request.user_id.clone(), plan.questions, self.clock.now())
    }

    /// Answer the current question, persist the learner's progress, and advance.
    ///
    /// The session only advances once the progress write has succeeded.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is finished.
    /// Returns `SessionError::Answer` for grading or persistence failures.
    pub async fn answer_current(
        &self,
        session: &mut TestSession,
        choice: usize,
    ) -> Result<SessionAnswerResult, SessionError> {
        let question = session
            .current_question()
            .ok_or(SessionError::Completed)?
            .clone();

        let recorded = self
            .answers
            .record_answer(session.user_id(), &question, choice, self.progress.as_ref())
            .await?;
        let answered_at = recorded.progress.stats().last_reviewed;
        let answer = session.answer_current(choice, answered_at)?.clone();

        Ok(SessionAnswerResult {
            answer,
            progress: recorded.progress,
            is_complete: session.is_complete(),
        })
    }
}
