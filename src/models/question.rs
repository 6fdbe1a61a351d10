// src/models/question.rs

use serde::{Deserialize, Deserializer, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

use crate::utils::html::clean_html;

/// Represents the 'questions' table in the database.
/// Every question has exactly one correct answer and three wrong ones.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub subject_id: i64,

    /// The text content of the question.
    pub text: String,

    pub correct_answer: String,

    pub wrong_answer1: String,
    pub wrong_answer2: String,
    pub wrong_answer3: String,

    /// Explanation shown when reviewing a finished attempt.
    pub explanation: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// A question ready to be stored. Text has already been sanitized.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub subject_id: i64,
    pub text: String,
    pub correct_answer: String,
    pub wrong_answers: [String; 3],
    pub explanation: Option<String>,
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: String,
    #[validate(length(min = 1, max = 500))]
    pub wrong_answer1: String,
    #[validate(length(min = 1, max = 500))]
    pub wrong_answer2: String,
    #[validate(length(min = 1, max = 500))]
    pub wrong_answer3: String,
    #[validate(length(max = 4000))]
    pub explanation: Option<String>,
}

impl CreateQuestionRequest {
    pub fn into_new_question(self, subject_id: i64) -> NewQuestion {
        NewQuestion {
            subject_id,
            text: clean_html(&self.text),
            correct_answer: clean_html(&self.correct_answer),
            wrong_answers: [
                clean_html(&self.wrong_answer1),
                clean_html(&self.wrong_answer2),
                clean_html(&self.wrong_answer3),
            ],
            explanation: self.explanation.as_deref().map(clean_html),
        }
    }
}

/// DTO for updating a question. Fields are optional.
///
/// `explanation` distinguishes an absent field (left as is) from an explicit
/// `null` (cleared).
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    #[validate(length(min = 1, max = 2000))]
    pub text: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub correct_answer: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub wrong_answer1: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub wrong_answer2: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub wrong_answer3: Option<String>,
    #[validate(length(max = 4000))]
    #[serde(default, deserialize_with = "present_or_null")]
    pub explanation: Option<Option<String>>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl UpdateQuestionRequest {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.correct_answer.is_none()
            && self.wrong_answer1.is_none()
            && self.wrong_answer2.is_none()
            && self.wrong_answer3.is_none()
            && self.explanation.is_none()
    }

    /// Sanitizes every present field in place.
    pub fn sanitized(self) -> Self {
        let clean = |field: Option<String>| field.as_deref().map(clean_html);
        Self {
            text: clean(self.text),
            correct_answer: clean(self.correct_answer),
            wrong_answer1: clean(self.wrong_answer1),
            wrong_answer2: clean(self.wrong_answer2),
            wrong_answer3: clean(self.wrong_answer3),
            explanation: self.explanation.map(clean),
        }
    }

    pub fn apply_to(&self, question: &mut Question) {
        if let Some(text) = &self.text {
            question.text = text.clone();
        }
        if let Some(answer) = &self.correct_answer {
            question.correct_answer = answer.clone();
        }
        if let Some(answer) = &self.wrong_answer1 {
            question.wrong_answer1 = answer.clone();
        }
        if let Some(answer) = &self.wrong_answer2 {
            question.wrong_answer2 = answer.clone();
        }
        if let Some(answer) = &self.wrong_answer3 {
            question.wrong_answer3 = answer.clone();
        }
        if let Some(explanation) = &self.explanation {
            question.explanation = explanation.clone();
        }
    }
}

/// One row extracted from an uploaded spreadsheet.
/// `correct_index` is 1-based and points into `answer1..answer4`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    #[validate(length(min = 1, max = 2000))]
    pub question_text: String,
    #[validate(length(min = 1, max = 500))]
    pub answer1: String,
    #[validate(length(min = 1, max = 500))]
    pub answer2: String,
    #[validate(length(min = 1, max = 500))]
    pub answer3: String,
    #[validate(length(min = 1, max = 500))]
    pub answer4: String,
    #[validate(range(min = 1, max = 4))]
    pub correct_index: u8,
    #[validate(length(max = 4000))]
    pub explanation: Option<String>,
}

impl ImportRow {
    /// Maps the row onto the one-correct/three-wrong shape.
    /// The remaining answers keep their spreadsheet order.
    pub fn into_new_question(self, subject_id: i64) -> Result<NewQuestion, String> {
        let slot = usize::from(self.correct_index)
            .checked_sub(1)
            .filter(|slot| *slot < 4)
            .ok_or_else(|| format!("correctIndex must be between 1 and 4, got {}", self.correct_index))?;

        let mut answers = vec![self.answer1, self.answer2, self.answer3, self.answer4];
        let correct = answers.remove(slot);
        let [w1, w2, w3]: [String; 3] = answers
            .try_into()
            .map_err(|_| "row must carry exactly four answers".to_string())?;

        Ok(NewQuestion {
            subject_id,
            text: clean_html(&self.question_text),
            correct_answer: clean_html(&correct),
            wrong_answers: [clean_html(&w1), clean_html(&w2), clean_html(&w3)],
            explanation: self.explanation.as_deref().map(clean_html),
        })
    }
}

/// DTO for a bulk import request.
#[derive(Debug, Deserialize)]
pub struct ImportQuestionsRequest {
    pub rows: Vec<ImportRow>,
}

/// Outcome of a bulk import.
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub subject_id: i64,
    pub imported: u64,
}
