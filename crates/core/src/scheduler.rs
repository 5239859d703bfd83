use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mastery::estimate_mastery;
use crate::model::{MAX_MASTERY, ProgressError, ProgressStats};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("mastery level must be in 0..={MAX_MASTERY}, got {provided}")]
    MasteryOutOfRange { provided: u8 },
    #[error("interval steps must be ordered by strictly descending mastery threshold")]
    UnorderedSteps,
    #[error("interval step threshold must be at most {MAX_MASTERY}, got {provided}")]
    ThresholdOutOfRange { provided: u8 },
    #[error("review intervals must be at least one day")]
    ZeroInterval,
    #[error("interval adjustment percentages must be positive")]
    ZeroAdjustment,
    #[error("review date overflows the calendar: {today} + {days} days")]
    DateOverflow { today: NaiveDate, days: u32 },
    #[error(transparent)]
    Progress(#[from] ProgressError),
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// One row of the stepped interval table: at or above `min_mastery`, wait `base_days`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalStep {
    pub min_mastery: u8,
    pub base_days: u32,
}

impl IntervalStep {
    #[must_use]
    pub const fn new(min_mastery: u8, base_days: u32) -> Self {
        Self {
            min_mastery,
            base_days,
        }
    }
}

/// Interval table and answer adjustments used by the [`Scheduler`].
///
/// Adjustments are whole percentages so that interval lengths are computed with
/// exact integer arithmetic (`floor(base * percent / 100)`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Steps ordered by descending `min_mastery`; the first match wins.
    pub steps: Vec<IntervalStep>,
    /// Base interval when no step matches.
    pub fallback_days: u32,
    /// Applied to the base interval after a correct answer.
    pub correct_percent: u32,
    /// Applied to the base interval after an incorrect answer.
    pub incorrect_percent: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            steps: vec![
                IntervalStep::new(90, 30),
                IntervalStep::new(70, 14),
                IntervalStep::new(50, 7),
                IntervalStep::new(30, 3),
            ],
            fallback_days: 1,
            correct_percent: 120,
            incorrect_percent: 50,
        }
    }
}

impl SchedulerConfig {
    /// Check that the table is usable.
    ///
    /// # Errors
    ///
    /// Returns a `SchedulerError` describing the first problem found.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.fallback_days == 0 {
            return Err(SchedulerError::ZeroInterval);
        }
        if self.correct_percent == 0 || self.incorrect_percent == 0 {
            return Err(SchedulerError::ZeroAdjustment);
        }
        for step in &self.steps {
            if step.min_mastery > MAX_MASTERY {
                return Err(SchedulerError::ThresholdOutOfRange {
                    provided: step.min_mastery,
                });
            }
            if step.base_days == 0 {
                return Err(SchedulerError::ZeroInterval);
            }
        }
        if self
            .steps
            .windows(2)
            .any(|pair| pair[0].min_mastery <= pair[1].min_mastery)
        {
            return Err(SchedulerError::UnorderedSteps);
        }
        Ok(())
    }
}

//
// ─── SCHEDULER ─────────────────────────────────────────────────────────────────
//

/// Stepped-interval review scheduler.
///
/// The next review date depends only on the mastery level *before* the answer, on
/// whether the answer was correct, and on today's date. The result is always at
/// least one day after `today`.
///
/// # Examples
///
/// ```
/// # use quiz_core::scheduler::Scheduler;
/// # use chrono::NaiveDate;
/// let scheduler = Scheduler::new();
/// let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
///
/// // 30 days * 1.2
/// let next = scheduler.next_review_date(95, true, today)?;
/// assert_eq!(next, NaiveDate::from_ymd_opt(2024, 2, 6).unwrap());
/// # Ok::<(), quiz_core::scheduler::SchedulerError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduler {
    config: SchedulerConfig,
}

impl Scheduler {
    /// Scheduler with the default interval table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }

    /// Scheduler with a custom interval table.
    ///
    /// # Errors
    ///
    /// Returns a `SchedulerError` if the config fails validation.
    pub fn try_with_config(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Base interval in days for the given mastery level.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::MasteryOutOfRange` for levels above 100.
    pub fn base_interval_days(&self, mastery_level: u8) -> Result<u32, SchedulerError> {
        if mastery_level > MAX_MASTERY {
            return Err(SchedulerError::MasteryOutOfRange {
                provided: mastery_level,
            });
        }
        Ok(self
            .config
            .steps
            .iter()
            .find(|step| mastery_level >= step.min_mastery)
            .map_or(self.config.fallback_days, |step| step.base_days))
    }

    /// Interval in days after adjusting the base for the answer outcome (never below 1).
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::MasteryOutOfRange` for levels above 100.
    pub fn interval_days(&self, mastery_level: u8, is_correct: bool) -> Result<u32, SchedulerError> {
        let base = u64::from(self.base_interval_days(mastery_level)?);
        let percent = if is_correct {
            self.config.correct_percent
        } else {
            self.config.incorrect_percent
        };
        let adjusted = (base * u64::from(percent) / 100).max(1);
        Ok(u32::try_from(adjusted).unwrap_or(u32::MAX))
    }

    /// Date on which the question becomes due again.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::MasteryOutOfRange` for levels above 100, or
    /// `DateOverflow` if the date cannot be represented.
    pub fn next_review_date(
        &self,
        mastery_level: u8,
        is_correct: bool,
        today: NaiveDate,
    ) -> Result<NaiveDate, SchedulerError> {
        let days = self.interval_days(mastery_level, is_correct)?;
        today
            .checked_add_days(Days::new(u64::from(days)))
            .ok_or(SchedulerError::DateOverflow { today, days })
    }

    /// Fold one answer into a learner's statistics.
    ///
    /// - For a first answer, pass `None`; the record starts from zero counts and mastery 0.
    /// - Counters and streak are updated first, then mastery is re-estimated from them.
    /// - The next review date uses the mastery level held *before* this answer.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::Progress` if `previous` violates the record invariants
    /// or a counter overflows, and propagates date errors from `next_review_date`.
    pub fn apply_answer(
        &self,
        previous: Option<&ProgressStats>,
        is_correct: bool,
        answered_at: DateTime<Utc>,
    ) -> Result<ProgressStats, SchedulerError> {
        if let Some(stats) = previous {
            stats.validate()?;
        }

        let (correct, incorrect, streak, reviews, prior_mastery) = previous.map_or(
            (0, 0, 0, 0, 0),
            |s| {
                (
                    s.correct_count,
                    s.incorrect_count,
                    s.streak_count,
                    s.review_count,
                    s.mastery_level,
                )
            },
        );

        let bump = |n: u32| n.checked_add(1).ok_or(ProgressError::CounterOverflow);
        let (correct_count, incorrect_count, streak_count) = if is_correct {
            (bump(correct)?, incorrect, bump(streak)?)
        } else {
            (correct, bump(incorrect)?, 0)
        };
        let total_attempts = correct_count
            .checked_add(incorrect_count)
            .ok_or(ProgressError::CounterOverflow)?;

        let next_review =
            self.next_review_date(prior_mastery, is_correct, answered_at.date_naive())?;

        let mut next = ProgressStats {
            correct_count,
            incorrect_count,
            total_attempts,
            streak_count,
            mastery_level: 0,
            review_count: bump(reviews)?,
            last_reviewed: answered_at,
            next_review,
            last_answer_correct: is_correct,
        };
        next.mastery_level = estimate_mastery(&next)?;
        Ok(next)
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Next review date for a record under the default interval table.
///
/// # Errors
///
/// See [`Scheduler::next_review_date`].
pub fn next_review_date(
    stats: &ProgressStats,
    is_correct: bool,
    today: NaiveDate,
) -> Result<NaiveDate, SchedulerError> {
    Scheduler::new().next_review_date(stats.mastery_level, is_correct, today)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
