use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::PgStore;
use crate::{
    error::StoreError,
    models::question::{NewQuestion, Question, UpdateQuestionRequest},
    repositories::{QuestionStore, StoreResult},
};

const QUESTION_COLUMNS: &str = "id, subject_id, text, correct_answer, wrong_answer1, \
     wrong_answer2, wrong_answer3, explanation, created_at";

/// Rows per INSERT during bulk import. Seven binds per row keeps each
/// statement well under the Postgres limit of 65535 parameters.
const IMPORT_CHUNK_ROWS: usize = 1000;

#[async_trait]
impl QuestionStore for PgStore {
    async fn fetch_questions(&self, subject_id: i64) -> StoreResult<Vec<Question>> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM subjects WHERE id = $1")
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Err(StoreError::NotFound(format!("Subject {} not found", subject_id)));
        }

        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE subject_id = $1 ORDER BY id"
        ))
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions for subject {}: {:?}", subject_id, e);
            e
        })?;

        Ok(questions)
    }

    async fn count_by_subject(&self, subject_id: i64) -> StoreResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM questions WHERE subject_id = $1")
                .bind(subject_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(question)
    }

    async fn create_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let [w1, w2, w3] = question.wrong_answers;

        let question = sqlx::query_as::<_, Question>(&format!(
            r#"
            INSERT INTO questions
            (subject_id, text, correct_answer, wrong_answer1, wrong_answer2, wrong_answer3, explanation)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {QUESTION_COLUMNS}
            "#
        ))
        .bind(question.subject_id)
        .bind(question.text)
        .bind(question.correct_answer)
        .bind(w1)
        .bind(w2)
        .bind(w3)
        .bind(question.explanation)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create question: {:?}", e);
            e
        })?;

        Ok(question)
    }

    async fn create_questions(&self, questions: Vec<NewQuestion>) -> StoreResult<u64> {
        if questions.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in questions.chunks(IMPORT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO questions \
                 (subject_id, text, correct_answer, wrong_answer1, wrong_answer2, wrong_answer3, explanation) ",
            );
            builder.push_values(chunk, |mut row, question| {
                let [w1, w2, w3] = &question.wrong_answers;
                row.push_bind(question.subject_id)
                    .push_bind(question.text.as_str())
                    .push_bind(question.correct_answer.as_str())
                    .push_bind(w1.as_str())
                    .push_bind(w2.as_str())
                    .push_bind(w3.as_str())
                    .push_bind(question.explanation.as_deref());
            });

            let result = builder.build().execute(&mut *tx).await.map_err(|e| {
                tracing::error!("Failed to import questions: {:?}", e);
                e
            })?;
            inserted += result.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }

    async fn update_question(
        &self,
        id: i64,
        update: &UpdateQuestionRequest,
    ) -> StoreResult<Option<Question>> {
        if update.is_empty() {
            return self.get_question(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE questions SET ");
        let mut separated = builder.separated(", ");

        let columns = [
            ("text", &update.text),
            ("correct_answer", &update.correct_answer),
            ("wrong_answer1", &update.wrong_answer1),
            ("wrong_answer2", &update.wrong_answer2),
            ("wrong_answer3", &update.wrong_answer3),
        ];

        for (column, value) in columns {
            if let Some(value) = value {
                separated.push(format!("{column} = "));
                separated.push_bind_unseparated(value.clone());
            }
        }

        // `Some(None)` writes NULL
        if let Some(explanation) = &update.explanation {
            separated.push("explanation = ");
            separated.push_bind_unseparated(explanation.clone());
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {QUESTION_COLUMNS}"));

        let question = builder
            .build_query_as::<Question>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to update question: {:?}", e);
                e
            })?;

        Ok(question)
    }

    async fn delete_question(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
