use quiz_core::model::{Progress, ProgressDraft, ProgressFilter, ProgressId, ProgressUpdate};

use super::{
    SqliteRepository,
    mapping::{PROGRESS_COLUMNS, map_progress_row, ser},
};
use crate::repository::{ProgressRepository, StorageError};

fn connection(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => StorageError::Connection(e.to_string()),
    }
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn list_progress(&self, filter: &ProgressFilter) -> Result<Vec<Progress>, StorageError> {
        let sql = format!(
            r"
            SELECT {PROGRESS_COLUMNS}
            FROM progress
            WHERE user_id = ?1 AND (?2 IS NULL OR question_id = ?2)
            ORDER BY last_reviewed DESC, id ASC
            "
        );

        let rows = sqlx::query(&sql)
            .bind(filter.user_id.as_str())
            .bind(filter.question_id.as_ref().map(|q| q.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(connection)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn create_progress(&self, draft: ProgressDraft) -> Result<Progress, StorageError> {
        let progress = draft.assign_id(ProgressId::generate()).map_err(ser)?;
        let stats = progress.stats();

        sqlx::query(
            r"
            INSERT INTO progress (
                id, user_id, question_id, correct_count, incorrect_count, total_attempts,
                streak_count, mastery_level, review_count, last_reviewed, next_review,
                last_answer_correct, difficulty_rating, notes
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ",
        )
        .bind(progress.id().as_str())
        .bind(progress.user_id().as_str())
        .bind(progress.question_id().as_str())
        .bind(i64::from(stats.correct_count))
        .bind(i64::from(stats.incorrect_count))
        .bind(i64::from(stats.total_attempts))
        .bind(i64::from(stats.streak_count))
        .bind(i64::from(stats.mastery_level))
        .bind(i64::from(stats.review_count))
        .bind(stats.last_reviewed)
        .bind(stats.next_review)
        .bind(stats.last_answer_correct)
        .bind(i64::from(progress.difficulty_rating()))
        .bind(progress.notes())
        .execute(&self.pool)
        .await
        .map_err(connection)?;

        Ok(progress)
    }

    async fn update_progress(
        &self,
        id: &ProgressId,
        update: ProgressUpdate,
    ) -> Result<Progress, StorageError> {
        let mut tx = self.pool.begin().await.map_err(connection)?;

        let sql = format!("SELECT {PROGRESS_COLUMNS} FROM progress WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(connection)?
            .ok_or(StorageError::NotFound)?;

        let mut progress = map_progress_row(&row)?;
        progress.apply_update(update).map_err(ser)?;
        let stats = progress.stats();

        sqlx::query(
            r"
            UPDATE progress SET
                correct_count = ?2,
                incorrect_count = ?3,
                total_attempts = ?4,
                streak_count = ?5,
                mastery_level = ?6,
                review_count = ?7,
                last_reviewed = ?8,
                next_review = ?9,
                last_answer_correct = ?10,
                difficulty_rating = ?11,
                notes = ?12
            WHERE id = ?1
            ",
        )
        .bind(progress.id().as_str())
        .bind(i64::from(stats.correct_count))
        .bind(i64::from(stats.incorrect_count))
        .bind(i64::from(stats.total_attempts))
        .bind(i64::from(stats.streak_count))
        .bind(i64::from(stats.mastery_level))
        .bind(i64::from(stats.review_count))
        .bind(stats.last_reviewed)
        .bind(stats.next_review)
        .bind(stats.last_answer_correct)
        .bind(i64::from(progress.difficulty_rating()))
        .bind(progress.notes())
        .execute(&mut *tx)
        .await
        .map_err(connection)?;

        tx.commit().await.map_err(connection)?;
        Ok(progress)
    }
}
