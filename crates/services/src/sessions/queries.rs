use chrono::NaiveDate;
use rand::Rng;

use quiz_core::model::{Progress, ProgressFilter, Question, QuestionFilter, UserId};
use storage::repository::{ProgressRepository, QuestionRepository, StorageError};

use super::plan::{DEFAULT_NEW_SHARE_PERCENT, SessionComposer, SessionPlan};
use crate::error::SessionError;

/// What a learner asked to be quizzed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub user_id: UserId,
    pub filter: QuestionFilter,
    pub limit: usize,
    pub include_new: bool,
    pub new_share_percent: u8,
}

impl SessionRequest {
    /// Request over the whole question bank, new questions included.
    #[must_use]
    pub fn new(user_id: UserId, limit: usize) -> Self {
        Self {
            user_id,
            filter: QuestionFilter::all(),
            limit,
            include_new: true,
            new_share_percent: DEFAULT_NEW_SHARE_PERCENT,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: QuestionFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_include_new(mut self, include_new: bool) -> Self {
        self.include_new = include_new;
        self
    }

    #[must_use]
    pub fn with_new_share_percent(mut self, percent: u8) -> Self {
        self.new_share_percent = percent;
        self
    }

    /// Composer configured for this request.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NewShareOutOfRange` for a share above 100.
    pub fn composer(&self, today: NaiveDate) -> Result<SessionComposer, SessionError> {
        SessionComposer::new(today, self.limit)
            .with_include_new(self.include_new)
            .with_new_share_percent(self.new_share_percent)
    }
}

/// Question and progress reads a session is composed from.
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionCandidates {
    pub questions: Vec<Question>,
    pub progress: Vec<Progress>,
}

/// Storage-backed session queries.
pub(crate) struct SessionQueries;

impl SessionQueries {
    /// Read the filtered questions and the learner's progress records.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when either read fails.
    pub async fn load_candidates(
        request: &SessionRequest,
        questions: &dyn QuestionRepository,
        progress: &dyn ProgressRepository,
    ) -> Result<SessionCandidates, SessionError> {
        let candidates = questions
            .list_questions(&request.filter)
            .await
            .inspect_err(|e| store_failure("questions", &request.user_id, e))?;
        let records = progress
            .list_progress(&ProgressFilter::for_user(request.user_id.clone()))
            .await
            .inspect_err(|e| store_failure("progress", &request.user_id, e))?;

        Ok(SessionCandidates {
            questions: candidates,
            progress: records,
        })
    }

    pub fn plan(
        request: &SessionRequest,
        candidates: SessionCandidates,
        today: NaiveDate,
        rng: &mut (impl Rng + ?Sized),
    ) -> Result<SessionPlan, SessionError> {
        let composer = request.composer(today)?;
        let plan = composer.compose(candidates.questions, &candidates.progress, rng);
        tracing::debug!(
            user_id = %request.user_id,
            limit = request.limit,
            include_new = request.include_new,
            new = plan.new_selected,
            due = plan.due_selected,
            backlog = plan.backlog_selected,
            "session composed"
        );
        Ok(plan)
    }

    /// Build a session plan using repository data.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when repository access fails.
    pub async fn build_plan_from_storage<R: Rng + ?Sized>(
        request: &SessionRequest,
        questions: &dyn QuestionRepository,
        progress: &dyn ProgressRepository,
        today: NaiveDate,
        rng: &mut R,
    ) -> Result<SessionPlan, SessionError> {
        let candidates = Self::load_candidates(request, questions, progress).await?;
        Self::plan(request, candidates, today, rng)
    }
}

fn store_failure(store: &'static str, user_id: &UserId, err: &StorageError) {
    tracing::warn!(store, user_id = %user_id, error = %err, "session store read failed");
}

/// Compose a session for one learner from the question and progress stores.
///
/// Returns at most `request.limit` distinct questions in random order. A store
/// failure aborts the whole composition.
///
/// # Errors
///
/// Returns `SessionError::Storage` when a read fails and
/// `SessionError::NewShareOutOfRange` for an invalid request.
pub async fn compose_session<R: Rng + ?Sized>(
    request: &SessionRequest,
    questions: &dyn QuestionRepository,
    progress: &dyn ProgressRepository,
    today: NaiveDate,
    rng: &mut R,
) -> Result<Vec<Question>, SessionError> {
    let plan =
        SessionQueries::build_plan_from_storage(request, questions, progress, today, rng).await?;
    Ok(plan.questions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{QuestionDraft, Subject};
    use quiz_core::time::{fixed_now, fixed_today};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use storage::repository::InMemoryRepository;

    async fn seed(repo: &InMemoryRepository, subject: &str, count: usize) {
        for i in 0..count {
            let draft = QuestionDraft {
                text: format!("{subject} {i}"),
                options: vec!["a".into(), "b".into()],
                correct_answer: 1,
                subject: Some(subject.into()),
                ..QuestionDraft::default()
            };
            repo.create_question(draft.validate(fixed_now()).unwrap())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn compose_session_respects_subject_filter() {
        let repo = InMemoryRepository::new();
        seed(&repo, "Math", 4).await;
        seed(&repo, "History", 4).await;
        let math = Subject::new("Math").unwrap();
        let request = SessionRequest::new(UserId::new("learner").unwrap(), 10)
            .with_filter(QuestionFilter::all().with_subject(math.clone()));

        let questions = compose_session(
            &request,
            &repo,
            &repo,
            fixed_today(),
            &mut StdRng::seed_from_u64(1),
        )
        .await
        .unwrap();

        assert_eq!(questions.len(), 4);
        assert!(questions.iter().all(|q| q.subject() == Some(&math)));
    }

    #[tokio::test]
    async fn invalid_share_is_rejected() {
        let repo = InMemoryRepository::new();
        seed(&repo, "Math", 1).await;
        let request =
            SessionRequest::new(UserId::new("learner").unwrap(), 5).with_new_share_percent(150);

        let err = compose_session(
            &request,
            &repo,
            &repo,
            fixed_today(),
            &mut StdRng::seed_from_u64(1),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SessionError::NewShareOutOfRange(150)));
    }
}
