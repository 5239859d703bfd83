use std::collections::BTreeSet;

use crate::model::ids::{QuestionId, UserId};
use crate::model::question::Question;
use crate::model::tag::{Subject, TagName};

/// Narrowing applied when listing questions.
///
/// Subject is matched exactly. Tags match when the question carries at least one
/// of the requested tags. Both conditions must hold when both are set; an empty
/// filter matches every question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub subject: Option<Subject>,
    pub tags: BTreeSet<TagName>,
}

impl QuestionFilter {
    /// A filter that matches every question.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = TagName>) -> Self {
        self.tags.extend(tags);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subject.is_none() && self.tags.is_empty()
    }

    #[must_use]
    pub fn matches(&self, question: &Question) -> bool {
        if let Some(subject) = &self.subject {
            if question.subject() != Some(subject) {
                return false;
            }
        }
        self.tags.is_empty() || !self.tags.is_disjoint(question.tags())
    }
}

/// Selects a learner's progress records, optionally for a single question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressFilter {
    pub user_id: UserId,
    pub question_id: Option<QuestionId>,
}

impl ProgressFilter {
    #[must_use]
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            question_id: None,
        }
    }

    #[must_use]
    pub fn for_question(user_id: UserId, question_id: QuestionId) -> Self {
        Self {
            user_id,
            question_id: Some(question_id),
        }
    }

    #[must_use]
    pub fn matches(&self, user_id: &UserId, question_id: &QuestionId) -> bool {
        &self.user_id == user_id && self.question_id.as_ref().is_none_or(|q| q == question_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::question::QuestionDraft;
    use crate::time::fixed_now;

    fn question(subject: Option<&str>, tags: &[&str]) -> Question {
        QuestionDraft {
            text: "Q".into(),
            options: vec!["a".into(), "b".into()],
            correct_answer: 0,
            explanation: None,
            subject: subject.map(str::to_owned),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
        }
        .validate(fixed_now())
        .unwrap()
        .assign_id(QuestionId::generate())
    }

    fn tag(name: &str) -> TagName {
        TagName::new(name).unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(QuestionFilter::all().matches(&question(None, &[])));
        assert!(QuestionFilter::all().is_empty());
    }

    #[test]
    fn subject_filter_is_exact() {
        let filter = QuestionFilter::all().with_subject(Subject::new("Math").unwrap());
        assert!(filter.matches(&question(Some("Math"), &[])));
        assert!(!filter.matches(&question(Some("History"), &[])));
        assert!(!filter.matches(&question(None, &[])));
    }

    #[test]
    fn tag_filter_matches_any_requested_tag() {
        let filter = QuestionFilter::all().with_tags([tag("algebra"), tag("geometry")]);
        assert!(filter.matches(&question(None, &["geometry", "hard"])));
        assert!(!filter.matches(&question(None, &["calculus"])));
    }

    #[test]
    fn subject_and_tags_combine() {
        let filter = QuestionFilter::all()
            .with_subject(Subject::new("Math").unwrap())
            .with_tags([tag("algebra")]);
        assert!(filter.matches(&question(Some("Math"), &["algebra"])));
        assert!(!filter.matches(&question(Some("Physics"), &["algebra"])));
        assert!(!filter.matches(&question(Some("Math"), &["geometry"])));
    }

    #[test]
    fn progress_filter_scopes_by_user_and_question() {
        let user = UserId::new("u1").unwrap();
        let other = UserId::new("u2").unwrap();
        let q1 = QuestionId::new("q1").unwrap();
        let q2 = QuestionId::new("q2").unwrap();

        let all = ProgressFilter::for_user(user.clone());
        assert!(all.matches(&user, &q1));
        assert!(all.matches(&user, &q2));
        assert!(!all.matches(&other, &q1));

        let one = ProgressFilter::for_question(user.clone(), q1.clone());
        assert!(one.matches(&user, &q1));
        assert!(!one.matches(&user, &q2));
    }
}
