use std::collections::BTreeSet;

use quiz_core::model::{
    Progress, ProgressDraft, ProgressId, ProgressStats, Question, QuestionId, Subject, TagName,
    UserId,
};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) const QUESTION_COLUMNS: &str =
    "id, text, options, correct_answer, explanation, subject, tags, created_at";

pub(crate) const PROGRESS_COLUMNS: &str = "id, user_id, question_id, correct_count, \
     incorrect_count, total_attempts, streak_count, mastery_level, review_count, last_reviewed, \
     next_review, last_answer_correct, difficulty_rating, notes";

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn i64_to_u8(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn usize_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn tags_to_json(tags: &BTreeSet<TagName>) -> Result<String, StorageError> {
    serde_json::to_string(tags).map_err(ser)
}

pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let options: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("options").map_err(ser)?).map_err(ser)?;
    let tags: BTreeSet<TagName> =
        serde_json::from_str(&row.try_get::<String, _>("tags").map_err(ser)?).map_err(ser)?;

    let correct_i64: i64 = row.try_get("correct_answer").map_err(ser)?;
    let correct_answer = usize::try_from(correct_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid correct_answer: {correct_i64}"))
    })?;

    let subject = row
        .try_get::<Option<String>, _>("subject")
        .map_err(ser)?
        .map(Subject::new)
        .transpose()
        .map_err(ser)?;

    Question::from_persisted(
        QuestionId::new(row.try_get::<String, _>("id").map_err(ser)?).map_err(ser)?,
        row.try_get("text").map_err(ser)?,
        options,
        correct_answer,
        row.try_get("explanation").map_err(ser)?,
        subject,
        tags,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<Progress, StorageError> {
    let stats = ProgressStats {
        correct_count: i64_to_u32(
            "correct_count",
            row.try_get("correct_count").map_err(ser)?,
        )?,
        incorrect_count: i64_to_u32(
            "incorrect_count",
            row.try_get("incorrect_count").map_err(ser)?,
        )?,
        total_attempts: i64_to_u32(
            "total_attempts",
            row.try_get("total_attempts").map_err(ser)?,
        )?,
        streak_count: i64_to_u32("streak_count", row.try_get("streak_count").map_err(ser)?)?,
        mastery_level: i64_to_u8("mastery_level", row.try_get("mastery_level").map_err(ser)?)?,
        review_count: i64_to_u32("review_count", row.try_get("review_count").map_err(ser)?)?,
        last_reviewed: row.try_get("last_reviewed").map_err(ser)?,
        next_review: row.try_get("next_review").map_err(ser)?,
        last_answer_correct: row.try_get("last_answer_correct").map_err(ser)?,
    };

    let draft = ProgressDraft {
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?).map_err(ser)?,
        question_id: QuestionId::new(row.try_get::<String, _>("question_id").map_err(ser)?)
            .map_err(ser)?,
        stats,
        difficulty_rating: i64_to_u8(
            "difficulty_rating",
            row.try_get("difficulty_rating").map_err(ser)?,
        )?,
        notes: row.try_get("notes").map_err(ser)?,
    };

    let id = ProgressId::new(row.try_get::<String, _>("id").map_err(ser)?).map_err(ser)?;
    draft.assign_id(id).map_err(ser)
}
