use std::collections::HashSet;

use chrono::NaiveDate;
use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::model::{Progress, Question, QuestionId};

use crate::error::SessionError;

/// Share of a session reserved for never-answered questions, in percent.
pub const DEFAULT_NEW_SHARE_PERCENT: u8 = 30;

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    pub questions: Vec<Question>,
    pub new_selected: usize,
    pub due_selected: usize,
    /// Questions pulled in only to fill the session up to its limit.
    pub backlog_selected: usize,
}

impl SessionPlan {
    /// Total number of questions in this plan.
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    /// Returns true when no questions were selected for this session.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Composes a session from candidate questions and the learner's progress records.
///
/// Selection order: new questions up to the new share, then due questions, then
/// any remaining candidate. Each pool is sampled uniformly without replacement and
/// the final order is shuffled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionComposer {
    today: NaiveDate,
    limit: usize,
    include_new: bool,
    new_share_percent: u8,
}

impl SessionComposer {
    #[must_use]
    pub fn new(today: NaiveDate, limit: usize) -> Self {
        Self {
            today,
            limit,
            include_new: true,
            new_share_percent: DEFAULT_NEW_SHARE_PERCENT,
        }
    }

    /// Enable or disable the reserved share for new questions.
    #[must_use]
    pub fn with_include_new(mut self, include_new: bool) -> Self {
        self.include_new = include_new;
        self
    }

    /// Override the new-question share.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NewShareOutOfRange` for values above 100.
    pub fn with_new_share_percent(mut self, percent: u8) -> Result<Self, SessionError> {
        if percent > 100 {
            return Err(SessionError::NewShareOutOfRange(percent));
        }
        self.new_share_percent = percent;
        Ok(self)
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Slots reserved for new questions: `ceil(limit * share / 100)`.
    #[must_use]
    pub fn new_quota(&self) -> usize {
        if !self.include_new {
            return 0;
        }
        self.limit
            .saturating_mul(usize::from(self.new_share_percent))
            .div_ceil(100)
            .min(self.limit)
    }

    /// Build a session plan.
    ///
    /// - `candidates` are the questions matching the caller's filters; repeated ids are
    ///   kept once.
    /// - `progress` holds the learner's records. A candidate without a record is new;
    ///   one whose record is due on or before `today` is due.
    pub fn compose<R: Rng + ?Sized>(
        &self,
        candidates: impl IntoIterator<Item = Question>,
        progress: &[Progress],
        rng: &mut R,
    ) -> SessionPlan {
        let answered: HashSet<&QuestionId> = progress.iter().map(Progress::question_id).collect();
        let due_ids: HashSet<&QuestionId> = progress
            .iter()
            .filter(|p| p.is_due(self.today))
            .map(Progress::question_id)
            .collect();

        let mut seen = HashSet::new();
        let mut new_pool = Vec::new();
        let mut due_pool = Vec::new();
        let mut backlog = Vec::new();
        for question in candidates {
            if !seen.insert(question.id().clone()) {
                continue;
            }
            if !answered.contains(question.id()) {
                new_pool.push(question);
            } else if due_ids.contains(question.id()) {
                due_pool.push(question);
            } else {
                backlog.push(question);
            }
        }

        let mut selected = Vec::with_capacity(self.limit.min(seen.len()));

        let new_selected = take_random(&mut new_pool, self.new_quota(), &mut selected, rng);
        backlog.append(&mut new_pool);

        let remaining = self.limit.saturating_sub(selected.len());
        let due_selected = take_random(&mut due_pool, remaining, &mut selected, rng);
        backlog.append(&mut due_pool);

        let remaining = self.limit.saturating_sub(selected.len());
        let backlog_selected = take_random(&mut backlog, remaining, &mut selected, rng);

        selected.shuffle(rng);

        SessionPlan {
            questions: selected,
            new_selected,
            due_selected,
            backlog_selected,
        }
    }
}

/// Move up to `count` uniformly sampled questions from `pool` into `selected`.
///
/// Unpicked questions stay in `pool`.
fn take_random<R: Rng + ?Sized>(
    pool: &mut Vec<Question>,
    count: usize,
    selected: &mut Vec<Question>,
    rng: &mut R,
) -> usize {
    let take = count.min(pool.len());
    if take == 0 {
        return 0;
    }
    pool.shuffle(rng);
    let rest = pool.split_off(take);
    selected.append(pool);
    *pool = rest;
    take
}
