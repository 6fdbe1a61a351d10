use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::PgStore;
use crate::{
    error::StoreError,
    models::user::{NewUser, SubscriptionPlan, User, UserRow},
    repositories::{StoreResult, UserStore},
};

const USER_COLUMNS: &str = "id, email, password, display_name, role, subscription_plan, \
     subscription_expires_at, created_at";

fn into_user(row: UserRow) -> StoreResult<User> {
    User::try_from(row).map_err(StoreError::Backend)
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(into_user)
            .transpose()
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Login DB error: {:?}", e);
            e
        })?
        .map(into_user)
        .transpose()
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, password, display_name, role)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::Conflict(_) => {
                StoreError::Conflict(format!("Email '{}' already registered", user.email))
            }
            other => {
                tracing::error!("Failed to create user: {:?}", other);
                other
            }
        })?;

        into_user(row)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_user).collect()
    }

    async fn update_subscription(
        &self,
        id: i64,
        plan: SubscriptionPlan,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET subscription_plan = $1, subscription_expires_at = $2
            WHERE id = $3
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(plan.as_str())
        .bind(expires_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update subscription for user {}: {:?}", id, e);
            e
        })?
        .map(into_user)
        .transpose()
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
