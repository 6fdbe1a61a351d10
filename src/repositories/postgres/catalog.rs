use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::PgStore;
use crate::{
    models::catalog::{Faculty, Subject, UpdateSubjectRequest},
    repositories::{CatalogStore, StoreResult},
};

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_faculties(&self) -> StoreResult<Vec<Faculty>> {
        let faculties = sqlx::query_as::<_, Faculty>(
            "SELECT id, name, created_at FROM faculties ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list faculties: {:?}", e);
            e
        })?;

        Ok(faculties)
    }

    async fn create_faculty(&self, name: &str) -> StoreResult<Faculty> {
        let faculty = sqlx::query_as::<_, Faculty>(
            "INSERT INTO faculties (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(faculty)
    }

    async fn rename_faculty(&self, id: i64, name: &str) -> StoreResult<Option<Faculty>> {
        let faculty = sqlx::query_as::<_, Faculty>(
            "UPDATE faculties SET name = $1 WHERE id = $2 RETURNING id, name, created_at",
        )
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(faculty)
    }

    async fn delete_faculty(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM faculties WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_subjects(&self, faculty_id: Option<i64>) -> StoreResult<Vec<Subject>> {
        let subjects = sqlx::query_as::<_, Subject>(
            r#"
            SELECT id, name, faculty_id, created_at
            FROM subjects
            WHERE ($1::BIGINT IS NULL OR faculty_id = $1)
            ORDER BY name
            "#,
        )
        .bind(faculty_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list subjects: {:?}", e);
            e
        })?;

        Ok(subjects)
    }

    async fn get_subject(&self, id: i64) -> StoreResult<Option<Subject>> {
        let subject = sqlx::query_as::<_, Subject>(
            "SELECT id, name, faculty_id, created_at FROM subjects WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(subject)
    }

    async fn create_subject(&self, name: &str, faculty_id: i64) -> StoreResult<Subject> {
        // A missing faculty surfaces as a foreign key violation -> NotFound.
        let subject = sqlx::query_as::<_, Subject>(
            r#"
            INSERT INTO subjects (name, faculty_id)
            VALUES ($1, $2)
            RETURNING id, name, faculty_id, created_at
            "#,
        )
        .bind(name)
        .bind(faculty_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(subject)
    }

    async fn update_subject(
        &self,
        id: i64,
        update: &UpdateSubjectRequest,
    ) -> StoreResult<Option<Subject>> {
        if update.is_empty() {
            return self.get_subject(id).await;
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE subjects SET ");
        let mut separated = builder.separated(", ");

        if let Some(name) = &update.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.clone());
        }

        if let Some(faculty_id) = update.faculty_id {
            separated.push("faculty_id = ");
            separated.push_bind_unseparated(faculty_id);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING id, name, faculty_id, created_at");

        let subject = builder
            .build_query_as::<Subject>()
            .fetch_optional(&self.pool)
            .await?;

        Ok(subject)
    }

    async fn delete_subject(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
