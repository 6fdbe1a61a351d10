// src/repositories/mod.rs

//! Storage collaborators. Handlers and the attempt engine only see these
//! traits; `postgres` backs them with sqlx, `memory` keeps everything in
//! process for tests and local demos.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::StoreError,
    models::{
        catalog::{Faculty, Subject, UpdateSubjectRequest},
        question::{NewQuestion, Question, UpdateQuestionRequest},
        result::AttemptResult,
        user::{NewUser, SubscriptionPlan, User},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_faculties(&self) -> StoreResult<Vec<Faculty>>;
    async fn create_faculty(&self, name: &str) -> StoreResult<Faculty>;
    async fn rename_faculty(&self, id: i64, name: &str) -> StoreResult<Option<Faculty>>;
    async fn delete_faculty(&self, id: i64) -> StoreResult<bool>;

    async fn list_subjects(&self, faculty_id: Option<i64>) -> StoreResult<Vec<Subject>>;
    async fn get_subject(&self, id: i64) -> StoreResult<Option<Subject>>;
    async fn create_subject(&self, name: &str, faculty_id: i64) -> StoreResult<Subject>;
    async fn update_subject(
        &self,
        id: i64,
        update: &UpdateSubjectRequest,
    ) -> StoreResult<Option<Subject>>;
    async fn delete_subject(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait QuestionStore: Send + Sync {
    /// Snapshot of a subject's bank. `NotFound` when the subject does not exist.
    async fn fetch_questions(&self, subject_id: i64) -> StoreResult<Vec<Question>>;
    async fn count_by_subject(&self, subject_id: i64) -> StoreResult<i64>;
    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>>;
    async fn create_question(&self, question: NewQuestion) -> StoreResult<Question>;
    /// Inserts all questions or none of them.
    async fn create_questions(&self, questions: Vec<NewQuestion>) -> StoreResult<u64>;
    async fn update_question(
        &self,
        id: i64,
        update: &UpdateQuestionRequest,
    ) -> StoreResult<Option<Question>>;
    async fn delete_question(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Persists a result and returns it with the store-assigned id.
    async fn save_result(&self, result: AttemptResult) -> StoreResult<AttemptResult>;
    /// Newest first, at most `limit` entries (`None` for all).
    async fn list_results(&self, user_id: i64, limit: Option<i64>)
    -> StoreResult<Vec<AttemptResult>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn update_subscription(
        &self,
        id: i64,
        plan: SubscriptionPlan,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<User>>;
    async fn delete_user(&self, id: i64) -> StoreResult<bool>;
}
