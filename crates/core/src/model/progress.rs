use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ProgressId, QuestionId, UserId};

/// Upper bound of the mastery scale.
pub const MAX_MASTERY: u8 = 100;

/// Learner-rated difficulty bounds (1 = trivial, 5 = very hard).
pub const MIN_DIFFICULTY_RATING: u8 = 1;
pub const MAX_DIFFICULTY_RATING: u8 = 5;
pub const DEFAULT_DIFFICULTY_RATING: u8 = 3;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error(
        "total attempts {total} does not equal correct ({correct}) + incorrect ({incorrect})"
    )]
    AttemptMismatch {
        correct: u32,
        incorrect: u32,
        total: u32,
    },
    #[error("streak {streak} exceeds the {correct} correct answers recorded")]
    StreakExceedsCorrect { streak: u32, correct: u32 },
    #[error("streak {streak} is non-zero but the last answer was incorrect")]
    StreakAfterIncorrect { streak: u32 },
    #[error("mastery level must be in 0..={MAX_MASTERY}, got {0}")]
    MasteryOutOfRange(u8),
    #[error(
        "difficulty rating must be in {MIN_DIFFICULTY_RATING}..={MAX_DIFFICULTY_RATING}, got {0}"
    )]
    DifficultyOutOfRange(u8),
    #[error("answer counters overflowed")]
    CounterOverflow,
}

//
// ─── STATS ─────────────────────────────────────────────────────────────────────
//

/// Answer statistics for one (learner, question) pair.
///
/// Everything the estimator and scheduler read or write lives here, so an answer
/// turns one `ProgressStats` into the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub correct_count: u32,
    pub incorrect_count: u32,
    pub total_attempts: u32,
    pub streak_count: u32,
    pub mastery_level: u8,
    pub review_count: u32,
    pub last_reviewed: DateTime<Utc>,
    pub next_review: NaiveDate,
    pub last_answer_correct: bool,
}

impl ProgressStats {
    /// Check the attempt counters only.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::AttemptMismatch` when `total_attempts` is not the sum of
    /// correct and incorrect answers, or `CounterOverflow` if that sum does not fit.
    pub fn check_counts(&self) -> Result<(), ProgressError> {
        let sum = self
            .correct_count
            .checked_add(self.incorrect_count)
            .ok_or(ProgressError::CounterOverflow)?;
        if sum != self.total_attempts {
            return Err(ProgressError::AttemptMismatch {
                correct: self.correct_count,
                incorrect: self.incorrect_count,
                total: self.total_attempts,
            });
        }
        Ok(())
    }

    /// Check every invariant of the record.
    ///
    /// # Errors
    ///
    /// Returns the first violated `ProgressError`.
    pub fn validate(&self) -> Result<(), ProgressError> {
        self.check_counts()?;
        if self.streak_count > self.correct_count {
            return Err(ProgressError::StreakExceedsCorrect {
                streak: self.streak_count,
                correct: self.correct_count,
            });
        }
        if self.streak_count > 0 && !self.last_answer_correct {
            return Err(ProgressError::StreakAfterIncorrect {
                streak: self.streak_count,
            });
        }
        if self.mastery_level > MAX_MASTERY {
            return Err(ProgressError::MasteryOutOfRange(self.mastery_level));
        }
        Ok(())
    }

    /// A question is due once its review date has arrived.
    #[must_use]
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review <= today
    }
}

fn check_difficulty(rating: u8) -> Result<(), ProgressError> {
    if (MIN_DIFFICULTY_RATING..=MAX_DIFFICULTY_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(ProgressError::DifficultyOutOfRange(rating))
    }
}

//
// ─── PROGRESS TYPES ────────────────────────────────────────────────────────────
//

/// A progress record that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressDraft {
    pub user_id: UserId,
    pub question_id: QuestionId,
    pub stats: ProgressStats,
    pub difficulty_rating: u8,
    pub notes: String,
}

impl ProgressDraft {
    /// Draft with the default difficulty rating and no notes.
    #[must_use]
    pub fn new(user_id: UserId, question_id: QuestionId, stats: ProgressStats) -> Self {
        Self {
            user_id,
            question_id,
            stats,
            difficulty_rating: DEFAULT_DIFFICULTY_RATING,
            notes: String::new(),
        }
    }

    /// Validate and attach the store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the stats or difficulty rating are invalid.
    pub fn assign_id(self, id: ProgressId) -> Result<Progress, ProgressError> {
        self.stats.validate()?;
        check_difficulty(self.difficulty_rating)?;
        Ok(Progress {
            id,
            user_id: self.user_id,
            question_id: self.question_id,
            stats: self.stats,
            difficulty_rating: self.difficulty_rating,
            notes: self.notes,
        })
    }
}

/// Partial record accepted by a progress store update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub stats: Option<ProgressStats>,
    pub difficulty_rating: Option<u8>,
    pub notes: Option<String>,
}

impl ProgressUpdate {
    /// Update carrying the statistics produced by a new answer.
    #[must_use]
    pub fn answer(stats: ProgressStats) -> Self {
        Self {
            stats: Some(stats),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_none() && self.difficulty_rating.is_none() && self.notes.is_none()
    }
}

/// Learning progress of one learner on one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Progress {
    id: ProgressId,
    user_id: UserId,
    question_id: QuestionId,
    stats: ProgressStats,
    difficulty_rating: u8,
    notes: String,
}

impl Progress {
    #[must_use]
    pub fn id(&self) -> &ProgressId {
        &self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn question_id(&self) -> &QuestionId {
        &self.question_id
    }

    #[must_use]
    pub fn stats(&self) -> &ProgressStats {
        &self.stats
    }

    #[must_use]
    pub fn mastery_level(&self) -> u8 {
        self.stats.mastery_level
    }

    #[must_use]
    pub fn next_review(&self) -> NaiveDate {
        self.stats.next_review
    }

    #[must_use]
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.stats.is_due(today)
    }

    #[must_use]
    pub fn difficulty_rating(&self) -> u8 {
        self.difficulty_rating
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Apply a partial update. Nothing changes if any field is invalid.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the new stats or difficulty rating are invalid.
    pub fn apply_update(&mut self, update: ProgressUpdate) -> Result<(), ProgressError> {
        if let Some(stats) = &update.stats {
            stats.validate()?;
        }
        if let Some(rating) = update.difficulty_rating {
            check_difficulty(rating)?;
        }

        if let Some(stats) = update.stats {
            self.stats = stats;
        }
        if let Some(rating) = update.difficulty_rating {
            self.difficulty_rating = rating;
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
