use chrono::{DateTime, Utc};

use quiz_core::{
    model::{
        Progress, ProgressDraft, ProgressFilter, ProgressId, ProgressStats, ProgressUpdate,
        Question, UserId,
    },
    scheduler::Scheduler,
    time::Clock,
};
use storage::repository::{ProgressRepository, StorageError};

use crate::error::AnswerServiceError;

//
// ─── ANSWER RESULT ─────────────────────────────────────────────────────────────
//

/// Outcome of recording one answer: the stored record and whether the choice was right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerResult {
    pub progress: Progress,
    pub is_correct: bool,
    /// True when this answer created the learner's first record for the question.
    pub created: bool,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Coordinates applying a learner's answer to their progress record using the scheduler.
#[derive(Debug, Clone)]
pub struct AnswerService {
    clock: Clock,
    scheduler: Scheduler,
}

impl AnswerService {
    /// Create an answer service using the default interval table and real-time clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            clock: Clock::default(),
            scheduler: Scheduler::new(),
        }
    }

    /// Create an answer service with a custom scheduler (still uses default clock).
    #[must_use]
    pub fn with_scheduler(scheduler: Scheduler) -> Self {
        Self {
            clock: Clock::default(),
            scheduler,
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Compute the statistics a record should hold after one more answer.
    ///
    /// `previous` is `None` for a question the learner has never answered.
    ///
    /// # Errors
    ///
    /// Propagates scheduler errors for corrupt records or counter overflow.
    pub fn next_stats(
        &self,
        previous: Option<&Progress>,
        is_correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<ProgressStats, AnswerServiceError> {
        Ok(self
            .scheduler
            .apply_answer(previous.map(Progress::stats), is_correct, answered_at)?)
    }

    /// Grade `choice` against `question`, then create or update the learner's record.
    ///
    /// Uses the service clock for `last_reviewed` and the scheduling date.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::ChoiceOutOfRange` for an invalid option index.
    /// Returns `StorageError::Conflict` if the store holds more than one record for the pair.
    /// Returns scheduler or storage errors from the read-modify-write.
    pub async fn record_answer(
        &self,
        user_id: &UserId,
        question: &Question,
        choice: usize,
        progress: &dyn ProgressRepository,
    ) -> Result<AnswerResult, AnswerServiceError> {
        let is_correct = question.is_correct(choice)?;
        let answered_at = self.now();

        let filter = ProgressFilter::for_question(user_id.clone(), question.id().clone());
        let mut existing = progress.list_progress(&filter).await?;
        if existing.len() > 1 {
            tracing::warn!(
                user_id = %user_id,
                question_id = %question.id(),
                records = existing.len(),
                "duplicate progress records"
            );
            return Err(StorageError::Conflict.into());
        }
        let previous = existing.pop();

        let stats = self.next_stats(previous.as_ref(), is_correct, answered_at)?;
        let next_review = stats.next_review;
        let mastery_level = stats.mastery_level;

        let (stored, created) = match previous {
            Some(record) => (
                progress
                    .update_progress(record.id(), ProgressUpdate::answer(stats))
                    .await?,
                false,
            ),
            None => (
                progress
                    .create_progress(ProgressDraft::new(
                        user_id.clone(),
                        question.id().clone(),
                        stats,
                    ))
                    .await?,
                true,
            ),
        };

        tracing::info!(
            user_id = %user_id,
            question_id = %question.id(),
            is_correct,
            mastery_level,
            %next_review,
            created,
            "answer recorded"
        );

        Ok(AnswerResult {
            progress: stored,
            is_correct,
            created,
        })
    }

    /// Set the learner's difficulty rating and/or notes on an existing record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record is missing and
    /// `StorageError::Serialization` if the rating is outside 1..=5.
    pub async fn annotate(
        &self,
        id: &ProgressId,
        difficulty_rating: Option<u8>,
        notes: Option<String>,
        progress: &dyn ProgressRepository,
    ) -> Result<Progress, AnswerServiceError> {
        let update = ProgressUpdate {
            stats: None,
            difficulty_rating,
            notes,
        };
        Ok(progress.update_progress(id, update).await?)
    }
}

impl Default for AnswerService {
    fn default() -> Self {
        Self::new()
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
    use quiz_core::time::{fixed_now, fixed_today};
    use storage::repository::{InMemoryRepository, QuestionRepository};

    async fn seed_question(repo: &InMemoryRepository) -> Question {
        let draft = QuestionDraft {
            text: "2 + 2 = ?".into(),
            options: vec!["3".into(), "4".into(), "5".into()],
            correct_answer: 1,
            explanation: Some("Basic addition.".into()),
            subject: Some("Math".into()),
            tags: vec!["arithmetic".into()],
        };
        repo.create_question(draft.validate(fixed_now()).unwrap())
            .await
            .unwrap()
    }

    fn learner() -> UserId {
        UserId::new("learner-1").unwrap()
    }

    #[tokio::test]
    async fn first_correct_answer_creates_record() {
        let repo = InMemoryRepository::new();
        let question = seed_question(&repo).await;
        let service = AnswerService::new().with_clock(Clock::fixed(fixed_now()));

        let result = service
            .record_answer(&learner(), &question, 1, &repo)
            .await
            .unwrap();

        assert!(result.is_correct);
        assert!(result.created);
        let stats = result.progress.stats();
        assert_eq!(stats.correct_count, 1);
        assert_eq!(stats.total_attempts, 1);
        assert_eq!(stats.streak_count, 1);
        assert_eq!(stats.mastery_level, 100);
        assert_eq!(stats.review_count, 1);
        assert_eq!(stats.last_reviewed, fixed_now());
        // scheduled from the pre-answer mastery of 0: base 1 day, +20% floors to 1
        assert_eq!(stats.next_review, fixed_today() + Duration::days(1));
    }

    #[tokio::test]
    async fn second_answer_updates_same_record() {
        let repo = InMemoryRepository::new();
        let question = seed_question(&repo).await;
        let mut clock = Clock::fixed(fixed_now());
        let first = AnswerService::new()
            .with_clock(clock)
            .record_answer(&learner(), &question, 1, &repo)
            .await
            .unwrap();

        clock.advance(Duration::days(1));
        let second = AnswerService::new()
            .with_clock(clock)
            .record_answer(&learner(), &question, 0, &repo)
            .await
            .unwrap();

        assert!(!second.is_correct);
        assert!(!second.created);
        assert_eq!(second.progress.id(), first.progress.id());
        let stats = second.progress.stats();
        assert_eq!(stats.correct_count, 1);
        assert_eq!(stats.incorrect_count, 1);
        assert_eq!(stats.streak_count, 0);
        assert_eq!(stats.mastery_level, 50);
        assert_eq!(stats.review_count, 2);
        // prior mastery 100: base 30 days, halved
        assert_eq!(
            stats.next_review,
            fixed_today() + Duration::days(1) + Duration::days(15)
        );

        let all = repo
            .list_progress(&ProgressFilter::for_user(learner()))
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn out_of_range_choice_is_rejected_before_storage() {
        let repo = InMemoryRepository::new();
        let question = seed_question(&repo).await;
        let service = AnswerService::new().with_clock(Clock::fixed(fixed_now()));

        let err = service
            .record_answer(&learner(), &question, 3, &repo)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AnswerServiceError::Question(QuestionError::ChoiceOutOfRange { index: 3, len: 3 })
        ));
        let all = repo
            .list_progress(&ProgressFilter::for_user(learner()))
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn annotate_sets_rating_and_notes_only() {
        let repo = InMemoryRepository::new();
        let question = seed_question(&repo).await;
        let service = AnswerService::new().with_clock(Clock::fixed(fixed_now()));
        let answered = service
            .record_answer(&learner(), &question, 1, &repo)
            .await
            .unwrap();

        let annotated = service
            .annotate(
                answered.progress.id(),
                Some(5),
                Some("tricky wording".into()),
                &repo,
            )
            .await
            .unwrap();

        assert_eq!(annotated.difficulty_rating(), 5);
        assert_eq!(annotated.notes(), "tricky wording");
        assert_eq!(annotated.stats(), answered.progress.stats());
    }

    #[tokio::test]
    async fn annotate_rejects_out_of_range_rating() {
        let repo = InMemoryRepository::new();
        let question = seed_question(&repo).await;
        let service = AnswerService::new().with_clock(Clock::fixed(fixed_now()));
        let answered = service
            .record_answer(&learner(), &question, 1, &repo)
            .await
            .unwrap();

        let err = service
            .annotate(answered.progress.id(), Some(0), None, &repo)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnswerServiceError::Storage(StorageError::Serialization(_))
        ));
    }
}
