use chrono::{DateTime, Utc};
use std::fmt;

use quiz_core::model::{Question, QuestionId, UserId};

use super::progress::{SessionProgress, SessionScore};
use crate::error::SessionError;

//
// ─── ANSWER WITH QUESTION ──────────────────────────────────────────────────────
//

/// Captures the outcome of answering a question within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAnswer {
    pub question_id: QuestionId,
    pub choice: usize,
    pub is_correct: bool,
    pub correct_answer: usize,
    pub explanation: Option<String>,
    pub answered_at: DateTime<Utc>,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory test session for one learner.
///
/// Steps through the composed questions in order, grading each choice.
pub struct TestSession {
    user_id: UserId,
    questions: Vec<Question>,
    current: usize,
    answers: Vec<SessionAnswer>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TestSession {
    /// Create a session over already-composed questions.
    ///
    /// `started_at` should come from the services layer clock to keep time deterministic.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn new(
        user_id: UserId,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }

        Ok(Self {
            user_id,
            questions,
            current: 0,
            answers: Vec::new(),
            started_at,
            completed_at: None,
        })
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[SessionAnswer] {
        &self.answers
    }

    /// Total number of questions in this session.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Number of questions that have already been answered.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Number of remaining questions that have not been answered yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.questions.len().saturating_sub(self.current)
    }

    /// Returns a summary of the current session progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.total_questions(),
            answered: self.answered_count(),
            remaining: self.remaining(),
            is_complete: self.is_complete(),
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Grade `choice` against the current question and advance.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Completed` if the session is already finished and
    /// `SessionError::Question` if `choice` is not a valid option index.
    pub fn answer_current(
        &mut self,
        choice: usize,
        answered_at: DateTime<Utc>,
    ) -> Result<&SessionAnswer, SessionError> {
        let question = self.current_question().ok_or(SessionError::Completed)?;
        let answer = SessionAnswer {
            question_id: question.id().clone(),
            choice,
            is_correct: question.is_correct(choice)?,
            correct_answer: question.correct_answer(),
            explanation: question.explanation().map(str::to_owned),
            answered_at,
        };

        self.answers.push(answer);
        self.current += 1;
        if self.current >= self.questions.len() {
            self.completed_at = Some(answered_at);
        }

        self.answers.last().ok_or(SessionError::Completed)
    }

    /// Score over the questions answered so far.
    ///
    /// Unanswered questions are not counted; see [`TestSession::progress`] for those.
    #[must_use]
    pub fn score(&self) -> SessionScore {
        let correct = self.answers.iter().filter(|a| a.is_correct).count();
        SessionScore::new(self.answers.len(), correct)
    }
}

impl fmt::Debug for TestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSession")
            .field("user_id", &self.user_id)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("answers_len", &self.answers.len())
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{QuestionDraft, QuestionError};
    use quiz_core::time::fixed_now;

    fn build_question(id: &str, correct_answer: usize) -> Question {
        QuestionDraft {
            text: format!("Question {id}"),
            options: vec!["a".into(), "b".into(), "c".into()],
            correct_answer,
            explanation: Some(format!("Because of {id}")),
            ..QuestionDraft::default()
        }
        .validate(fixed_now())
        .unwrap()
        .assign_id(QuestionId::new(id).unwrap())
    }

    fn learner() -> UserId {
        UserId::new("learner").unwrap()
    }

    #[test]
    fn empty_session_returns_error() {
        let err = TestSession::new(learner(), Vec::new(), fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::Empty));
    }

    #[test]
    fn session_advances_and_completes() {
        let questions = vec![build_question("q1", 0), build_question("q2", 2)];
        let mut session = TestSession::new(learner(), questions, fixed_now()).unwrap();

        assert_eq!(session.current_question().unwrap().id().as_str(), "q1");
        let first = session.answer_current(0, fixed_now()).unwrap();
        assert!(first.is_correct);
        assert_eq!(first.explanation.as_deref(), Some("Because of q1"));
        assert!(!session.is_complete());
        assert_eq!(session.remaining(), 1);

        let finished_at = fixed_now() + Duration::seconds(30);
        let second = session.answer_current(1, finished_at).unwrap();
        assert!(!second.is_correct);
        assert_eq!(second.correct_answer, 2);
        assert!(session.is_complete());
        assert_eq!(session.completed_at(), Some(finished_at));
        assert!(session.current_question().is_none());

        let score = session.score();
        assert_eq!((score.total, score.correct, score.incorrect, score.percent), (2, 1, 1, 50));
    }

    #[test]
    fn answering_after_completion_fails() {
        let mut session =
            TestSession::new(learner(), vec![build_question("q1", 0)], fixed_now()).unwrap();
        session.answer_current(0, fixed_now()).unwrap();

        let err = session.answer_current(0, fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::Completed));
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn invalid_choice_does_not_advance() {
        let mut session =
            TestSession::new(learner(), vec![build_question("q1", 0)], fixed_now()).unwrap();

        let err = session.answer_current(7, fixed_now()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Question(QuestionError::ChoiceOutOfRange { index: 7, len: 3 })
        ));
        assert_eq!(session.progress().answered, 0);
        assert!(!session.is_complete());
    }

    #[test]
    fn partial_session_scores_answered_questions_only() {
        let questions = vec![
            build_question("q1", 0),
            build_question("q2", 0),
            build_question("q3", 0),
            build_question("q4", 0),
        ];
        let mut session = TestSession::new(learner(), questions, fixed_now()).unwrap();
        assert_eq!(session.score(), SessionScore::new(0, 0));

        session.answer_current(0, fixed_now()).unwrap();

        let score = session.score();
        assert_eq!((score.total, score.correct, score.incorrect, score.percent), (1, 1, 0, 100));
        assert_eq!(session.remaining(), 3);
        assert_eq!(session.progress().total, 4);

        session.answer_current(2, fixed_now()).unwrap();
        let score = session.score();
        assert_eq!((score.total, score.correct, score.incorrect, score.percent), (2, 1, 1, 50));
    }
}
