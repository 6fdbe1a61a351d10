// src/models/catalog.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'faculties' table in the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Faculty {
    pub id: i64,
    pub name: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'subjects' table in the database.
/// Every subject belongs to one faculty and owns a question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Subject {
    pub id: i64,
    pub name: String,
    pub faculty_id: i64,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Subject detail with the size of its question bank.
#[derive(Debug, Serialize)]
pub struct SubjectDetail {
    #[serde(flatten)]
    pub subject: Subject,
    pub question_count: i64,
}

/// Query parameters for listing subjects.
#[derive(Debug, Deserialize)]
pub struct SubjectListParams {
    pub faculty_id: Option<i64>,
}

/// DTO for creating or renaming a faculty.
#[derive(Debug, Deserialize, Validate)]
pub struct FacultyRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
}

/// DTO for creating a subject.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub faculty_id: i64,
}

/// DTO for updating a subject. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSubjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub faculty_id: Option<i64>,
}

impl UpdateSubjectRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.faculty_id.is_none()
    }
}
