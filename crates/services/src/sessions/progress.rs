use serde::Serialize;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub is_complete: bool,
}

/// Result of a test session, counted over answered questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionScore {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Share of correct answers, rounded half up to a whole percent.
    pub percent: u8,
}

impl SessionScore {
    #[must_use]
    pub fn new(total: usize, correct: usize) -> Self {
        let correct = correct.min(total);
        let percent = if total == 0 {
            0
        } else {
            let scaled = (correct as u128 * 200 + total as u128) / (total as u128 * 2);
            u8::try_from(scaled).unwrap_or(100)
        };
        Self {
            total,
            correct,
            incorrect: total - correct,
            percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_rounds_half_up() {
        assert_eq!(SessionScore::new(3, 2).percent, 67);
        assert_eq!(SessionScore::new(8, 1).percent, 13);
        assert_eq!(SessionScore::new(200, 1).percent, 1);
        assert_eq!(SessionScore::new(4, 4).percent, 100);
    }

    #[test]
    fn empty_session_scores_zero() {
        let score = SessionScore::new(0, 0);
        assert_eq!(score.percent, 0);
        assert_eq!(score.incorrect, 0);
    }
}
