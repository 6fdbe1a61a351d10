use async_trait::async_trait;

use super::PgStore;
use crate::{
    error::StoreError,
    models::result::{AttemptResult, ResultRow},
    repositories::{ResultStore, StoreResult},
};

#[async_trait]
impl ResultStore for PgStore {
    async fn save_result(&self, result: AttemptResult) -> StoreResult<AttemptResult> {
        let row = sqlx::query_as::<_, ResultRow>(
            r#"
            INSERT INTO results
            (user_id, subject_id, score, total_questions, correct_count, elapsed_seconds, mode, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, subject_id, score, total_questions, correct_count,
                      elapsed_seconds, mode, created_at
            "#,
        )
        .bind(result.user_id)
        .bind(result.subject_id)
        .bind(result.score)
        .bind(result.total_questions)
        .bind(result.correct_count)
        .bind(result.elapsed_seconds)
        .bind(result.mode.as_str())
        .bind(result.created_at)
        .fetch_one(&self.pool)
        .await?;

        AttemptResult::try_from(row).map_err(StoreError::Backend)
    }

    async fn list_results(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> StoreResult<Vec<AttemptResult>> {
        let rows = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT id, user_id, subject_id, score, total_questions, correct_count,
                   elapsed_seconds, mode, created_at
            FROM results
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list results for user {}: {:?}", user_id, e);
            e
        })?;

        rows.into_iter()
            .map(|row| AttemptResult::try_from(row).map_err(StoreError::Backend))
            .collect()
    }
}
