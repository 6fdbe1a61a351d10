// src/repositories/memory.rs

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::StoreError,
    models::{
        catalog::{Faculty, Subject, UpdateSubjectRequest},
        question::{NewQuestion, Question, UpdateQuestionRequest},
        result::AttemptResult,
        user::{NewUser, SubscriptionPlan, User},
    },
    repositories::{CatalogStore, QuestionStore, ResultStore, StoreResult, UserStore},
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    faculties: BTreeMap<i64, Faculty>,
    subjects: BTreeMap<i64, Subject>,
    questions: BTreeMap<i64, Question>,
    results: Vec<AttemptResult>,
    users: BTreeMap<i64, User>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process implementation of every store trait.
/// Ids come from one shared sequence; deletes cascade like the SQL schema.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_faculties(&self) -> StoreResult<Vec<Faculty>> {
        let tables = self.tables.read().await;
        let mut faculties: Vec<_> = tables.faculties.values().cloned().collect();
        faculties.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(faculties)
    }

    async fn create_faculty(&self, name: &str) -> StoreResult<Faculty> {
        let mut tables = self.tables.write().await;
        if tables.faculties.values().any(|f| f.name == name) {
            return Err(StoreError::Conflict(format!("Faculty '{}' already exists", name)));
        }
        let faculty = Faculty {
            id: tables.next_id(),
            name: name.to_string(),
            created_at: Some(Utc::now()),
        };
        tables.faculties.insert(faculty.id, faculty.clone());
        Ok(faculty)
    }

    async fn rename_faculty(&self, id: i64, name: &str) -> StoreResult<Option<Faculty>> {
        let mut tables = self.tables.write().await;
        if tables.faculties.values().any(|f| f.name == name && f.id != id) {
            return Err(StoreError::Conflict(format!("Faculty '{}' already exists", name)));
        }
        Ok(tables.faculties.get_mut(&id).map(|faculty| {
            faculty.name = name.to_string();
            faculty.clone()
        }))
    }

    async fn delete_faculty(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.faculties.remove(&id).is_none() {
            return Ok(false);
        }
        let subject_ids: Vec<i64> = tables
            .subjects
            .values()
            .filter(|s| s.faculty_id == id)
            .map(|s| s.id)
            .collect();
        for subject_id in subject_ids {
            tables.subjects.remove(&subject_id);
            tables.questions.retain(|_, q| q.subject_id != subject_id);
            tables.results.retain(|r| r.subject_id != subject_id);
        }
        Ok(true)
    }

    async fn list_subjects(&self, faculty_id: Option<i64>) -> StoreResult<Vec<Subject>> {
        let tables = self.tables.read().await;
        let mut subjects: Vec<_> = tables
            .subjects
            .values()
            .filter(|s| faculty_id.is_none_or(|f| s.faculty_id == f))
            .cloned()
            .collect();
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subjects)
    }

    async fn get_subject(&self, id: i64) -> StoreResult<Option<Subject>> {
        Ok(self.tables.read().await.subjects.get(&id).cloned())
    }

    async fn create_subject(&self, name: &str, faculty_id: i64) -> StoreResult<Subject> {
        let mut tables = self.tables.write().await;
        if !tables.faculties.contains_key(&faculty_id) {
            return Err(StoreError::NotFound(format!("Faculty {} not found", faculty_id)));
        }
        let subject = Subject {
            id: tables.next_id(),
            name: name.to_string(),
            faculty_id,
            created_at: Some(Utc::now()),
        };
        tables.subjects.insert(subject.id, subject.clone());
        Ok(subject)
    }

    async fn update_subject(
        &self,
        id: i64,
        update: &UpdateSubjectRequest,
    ) -> StoreResult<Option<Subject>> {
        let mut tables = self.tables.write().await;
        if let Some(faculty_id) = update.faculty_id {
            if !tables.faculties.contains_key(&faculty_id) {
                return Err(StoreError::NotFound(format!("Faculty {} not found", faculty_id)));
            }
        }
        Ok(tables.subjects.get_mut(&id).map(|subject| {
            if let Some(name) = &update.name {
                subject.name = name.clone();
            }
            if let Some(faculty_id) = update.faculty_id {
                subject.faculty_id = faculty_id;
            }
            subject.clone()
        }))
    }

    async fn delete_subject(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.subjects.remove(&id).is_none() {
            return Ok(false);
        }
        tables.questions.retain(|_, q| q.subject_id != id);
        tables.results.retain(|r| r.subject_id != id);
        Ok(true)
    }
}

fn build_question(id: i64, new: NewQuestion) -> Question {
    let [wrong_answer1, wrong_answer2, wrong_answer3] = new.wrong_answers;
    Question {
        id,
        subject_id: new.subject_id,
        text: new.text,
        correct_answer: new.correct_answer,
        wrong_answer1,
        wrong_answer2,
        wrong_answer3,
        explanation: new.explanation,
        created_at: Some(Utc::now()),
    }
}

#[async_trait]
impl QuestionStore for MemoryStore {
    async fn fetch_questions(&self, subject_id: i64) -> StoreResult<Vec<Question>> {
        let tables = self.tables.read().await;
        if !tables.subjects.contains_key(&subject_id) {
            return Err(StoreError::NotFound(format!("Subject {} not found", subject_id)));
        }
        Ok(tables
            .questions
            .values()
            .filter(|q| q.subject_id == subject_id)
            .cloned()
            .collect())
    }

    async fn count_by_subject(&self, subject_id: i64) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables
            .questions
            .values()
            .filter(|q| q.subject_id == subject_id)
            .count() as i64)
    }

    async fn get_question(&self, id: i64) -> StoreResult<Option<Question>> {
        Ok(self.tables.read().await.questions.get(&id).cloned())
    }

    async fn create_question(&self, question: NewQuestion) -> StoreResult<Question> {
        let mut tables = self.tables.write().await;
        if !tables.subjects.contains_key(&question.subject_id) {
            return Err(StoreError::NotFound(format!(
                "Subject {} not found",
                question.subject_id
            )));
        }
        let id = tables.next_id();
        let question = build_question(id, question);
        tables.questions.insert(id, question.clone());
        Ok(question)
    }

    async fn create_questions(&self, questions: Vec<NewQuestion>) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        if let Some(missing) = questions
            .iter()
            .find(|q| !tables.subjects.contains_key(&q.subject_id))
        {
            return Err(StoreError::NotFound(format!(
                "Subject {} not found",
                missing.subject_id
            )));
        }
        let count = questions.len() as u64;
        for question in questions {
            let id = tables.next_id();
            tables.questions.insert(id, build_question(id, question));
        }
        Ok(count)
    }

    async fn update_question(
        &self,
        id: i64,
        update: &UpdateQuestionRequest,
    ) -> StoreResult<Option<Question>> {
        let mut tables = self.tables.write().await;
        Ok(tables.questions.get_mut(&id).map(|question| {
            update.apply_to(question);
            question.clone()
        }))
    }

    async fn delete_question(&self, id: i64) -> StoreResult<bool> {
        Ok(self.tables.write().await.questions.remove(&id).is_some())
    }
}

#[async_trait]
impl ResultStore for MemoryStore {
    async fn save_result(&self, mut result: AttemptResult) -> StoreResult<AttemptResult> {
        let mut tables = self.tables.write().await;
        result.id = Some(tables.next_id());
        tables.results.push(result.clone());
        Ok(result)
    }

    async fn list_results(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> StoreResult<Vec<AttemptResult>> {
        let tables = self.tables.read().await;
        // Insertion order breaks ties between identical timestamps.
        let mut results: Vec<_> = tables
            .results
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            results.truncate(limit.max(0) as usize);
        }
        Ok(results)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!(
                "Email '{}' already registered",
                user.email
            )));
        }
        let user = User {
            id: tables.next_id(),
            email: user.email,
            password: user.password_hash,
            display_name: user.display_name,
            role: user.role,
            subscription_plan: SubscriptionPlan::Free,
            subscription_expires_at: None,
            created_at: Some(Utc::now()),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().rev().cloned().collect())
    }

    async fn update_subscription(
        &self,
        id: i64,
        plan: SubscriptionPlan,
        expires_at: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.subscription_plan = plan;
            user.subscription_expires_at = expires_at;
            user.clone()
        }))
    }

    async fn delete_user(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.results.retain(|r| r.user_id != id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::result::AttemptMode;
    use chrono::Duration;

    fn new_question(subject_id: i64, text: &str) -> NewQuestion {
        NewQuestion {
            subject_id,
            text: text.to_string(),
            correct_answer: "A".to_string(),
            wrong_answers: ["B".to_string(), "C".to_string(), "D".to_string()],
            explanation: None,
        }
    }

    fn result_at(user_id: i64, created_at: DateTime<Utc>) -> AttemptResult {
        AttemptResult {
            id: None,
            user_id,
            subject_id: 1,
            score: 50,
            total_questions: 2,
            correct_count: 1,
            elapsed_seconds: 10,
            mode: AttemptMode::Untimed,
            created_at,
        }
    }

    #[tokio::test]
    async fn test_fetch_questions_for_unknown_subject_is_not_found() {
        let store = MemoryStore::new();
        let err = store.fetch_questions(99).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_fetch_questions_scoped_to_subject() {
        let store = MemoryStore::new();
        let faculty = store.create_faculty("Science").await.unwrap();
        let physics = store.create_subject("Physics", faculty.id).await.unwrap();
        let chemistry = store.create_subject("Chemistry", faculty.id).await.unwrap();

        store.create_question(new_question(physics.id, "p1")).await.unwrap();
        store
            .create_questions(vec![
                new_question(chemistry.id, "c1"),
                new_question(chemistry.id, "c2"),
            ])
            .await
            .unwrap();

        assert_eq!(store.fetch_questions(physics.id).await.unwrap().len(), 1);
        assert_eq!(store.count_by_subject(chemistry.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_bulk_insert_is_all_or_nothing() {
        let store = MemoryStore::new();
        let faculty = store.create_faculty("Science").await.unwrap();
        let subject = store.create_subject("Physics", faculty.id).await.unwrap();

        let err = store
            .create_questions(vec![new_question(subject.id, "ok"), new_question(404, "bad")])
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.count_by_subject(subject.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_results_newest_first_and_capped() {
        let store = MemoryStore::new();
        let base = Utc::now();
        for i in 0..5 {
            store
                .save_result(result_at(1, base + Duration::seconds(i)))
                .await
                .unwrap();
        }
        store.save_result(result_at(2, base)).await.unwrap();

        let results = store.list_results(1, Some(3)).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].created_at, base + Duration::seconds(4));
        assert!(results.iter().all(|r| r.user_id == 1 && r.id.is_some()));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        let new_user = NewUser {
            email: "a@example.com".to_string(),
            password_hash: "h".to_string(),
            display_name: "A".to_string(),
            role: crate::models::user::UserRole::Student,
        };
        store.create_user(new_user.clone()).await.unwrap();
        assert!(matches!(
            store.create_user(new_user).await,
            Err(StoreError::Conflict(_))
        ));
    }
}
