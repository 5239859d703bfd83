//! Mastery estimation from a learner's answer history on one question.

use crate::model::{MAX_MASTERY, ProgressError, ProgressStats};

/// Bonus points granted per consecutive correct answer.
pub const STREAK_BONUS_PER_ANSWER: u32 = 5;
/// Cap on the streak bonus.
pub const MAX_STREAK_BONUS: u32 = 20;

/// Estimate mastery on a 0–100 scale.
///
/// `floor(correct / total * 100)` plus five points per streak answer (capped at 20),
/// capped at 100. A record with no attempts scores only its streak bonus, which is
/// zero for any valid record.
///
/// The ratio is computed with integer arithmetic so that e.g. 29 of 100 yields
/// exactly 29.
///
/// # Errors
///
/// Returns `ProgressError::AttemptMismatch` if `total_attempts` is not the sum of
/// correct and incorrect answers.
///
/// # Examples
///
/// ```
/// # use quiz_core::mastery::estimate_mastery;
/// # use quiz_core::model::ProgressStats;
/// # use quiz_core::time::{fixed_now, fixed_today};
/// let stats = ProgressStats {
///     correct_count: 3,
///     incorrect_count: 1,
///     total_attempts: 4,
///     streak_count: 2,
///     mastery_level: 0,
///     review_count: 4,
///     last_reviewed: fixed_now(),
///     next_review: fixed_today(),
///     last_answer_correct: true,
/// };
/// assert_eq!(estimate_mastery(&stats)?, 85);
/// # Ok::<(), quiz_core::model::ProgressError>(())
/// ```
pub fn estimate_mastery(stats: &ProgressStats) -> Result<u8, ProgressError> {
    stats.check_counts()?;

    let ratio_points = if stats.total_attempts == 0 {
        0
    } else {
        u64::from(stats.correct_count) * 100 / u64::from(stats.total_attempts)
    };
    let streak_bonus = stats
        .streak_count
        .saturating_mul(STREAK_BONUS_PER_ANSWER)
        .min(MAX_STREAK_BONUS);

    let mastery = (ratio_points + u64::from(streak_bonus)).min(u64::from(MAX_MASTERY));
    // bounded by MAX_MASTERY above
    Ok(u8::try_from(mastery).unwrap_or(MAX_MASTERY))
}
