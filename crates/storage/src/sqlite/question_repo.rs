use quiz_core::model::{Question, QuestionFilter, QuestionId, ValidatedQuestion};

use super::{
    SqliteRepository,
    mapping::{
        QUESTION_COLUMNS, map_question_row, options_to_json, tags_to_json, usize_to_i64,
    },
};
use crate::repository::{QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn create_question(&self, question: ValidatedQuestion) -> Result<Question, StorageError> {
        let question = question.assign_id(QuestionId::generate());

        sqlx::query(
            r"
            INSERT INTO questions (
                id, text, options, correct_answer, explanation, subject, tags, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(question.id().as_str())
        .bind(question.text())
        .bind(options_to_json(question.options())?)
        .bind(usize_to_i64("correct_answer", question.correct_answer())?)
        .bind(question.explanation())
        .bind(question.subject().map(|s| s.as_str()))
        .bind(tags_to_json(question.tags())?)
        .bind(question.created_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(question)
    }

    async fn get_question(&self, id: &QuestionId) -> Result<Question, StorageError> {
        let sql = format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;
        map_question_row(&row)
    }

    async fn list_questions(&self, filter: &QuestionFilter) -> Result<Vec<Question>, StorageError> {
        let mut sql = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions\nWHERE (?1 IS NULL OR subject = ?1)\n"
        );

        if !filter.tags.is_empty() {
            sql.push_str(
                "  AND EXISTS (SELECT 1 FROM json_each(questions.tags) WHERE json_each.value IN (",
            );
            for i in 0..filter.tags.len() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push('?');
                sql.push_str(&(i + 2).to_string());
            }
            sql.push_str("))\n");
        }
        sql.push_str("ORDER BY created_at DESC, id DESC");

        let mut q = sqlx::query(&sql).bind(filter.subject.as_ref().map(|s| s.as_str()));
        for tag in &filter.tags {
            q = q.bind(tag.as_str());
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        rows.iter().map(map_question_row).collect()
    }
}
