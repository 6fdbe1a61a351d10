// src/handlers/questions.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::question::{
        CreateQuestionRequest, ImportQuestionsRequest, ImportSummary, UpdateQuestionRequest,
    },
    state::AppState,
};

async fn ensure_subject(state: &AppState, subject_id: i64) -> Result<(), AppError> {
    state
        .catalog
        .get_subject(subject_id)
        .await?
        .ok_or(AppError::NotFound(format!("Subject {} not found", subject_id)))?;
    Ok(())
}

/// Lists a subject's questions including the correct answers.
/// Admin only.
pub async fn list_questions(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let questions = state.questions.fetch_questions(subject_id).await?;
    Ok(Json(questions))
}

/// Adds a question to a subject. Text fields are sanitized.
/// Admin only.
pub async fn create_question(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }
    ensure_subject(&state, subject_id).await?;

    let question = state
        .questions
        .create_question(payload.into_new_question(subject_id))
        .await?;

    Ok((StatusCode::CREATED, Json(question)))
}

/// Updates a question. Absent fields are left unchanged.
/// Admin only.
pub async fn update_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let question = state
        .questions
        .update_question(id, &payload.sanitized())
        .await?
        .ok_or(AppError::NotFound(format!("Question {} not found", id)))?;

    Ok(Json(question))
}

/// Deletes a question.
/// Admin only.
pub async fn delete_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.questions.delete_question(id).await? {
        return Err(AppError::NotFound(format!("Question {} not found", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Imports spreadsheet rows into a subject.
///
/// Every row is checked first. If any row is invalid nothing is stored and
/// the response lists the problems by 1-based row number.
/// Admin only.
pub async fn import_questions(
    State(state): State<AppState>,
    Path(subject_id): Path<i64>,
    Json(payload): Json<ImportQuestionsRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.rows.is_empty() {
        return Err(AppError::BadRequest("No rows to import".to_string()));
    }
    ensure_subject(&state, subject_id).await?;

    let mut questions = Vec::with_capacity(payload.rows.len());
    let mut problems = Vec::new();

    for (index, row) in payload.rows.into_iter().enumerate() {
        let line = index + 1;
        if let Err(e) = row.validate() {
            problems.push(format!("row {}: {}", line, e));
            continue;
        }
        match row.into_new_question(subject_id) {
            Ok(question) => questions.push(question),
            Err(e) => problems.push(format!("row {}: {}", line, e)),
        }
    }

    if !problems.is_empty() {
        tracing::warn!(
            "Rejected import into subject {}: {} invalid rows",
            subject_id,
            problems.len()
        );
        return Err(AppError::BadRequest(problems.join("; ")));
    }

    let imported = state.questions.create_questions(questions).await?;
    tracing::info!("Imported {} questions into subject {}", imported, subject_id);

    Ok((
        StatusCode::CREATED,
        Json(ImportSummary {
            subject_id,
            imported,
        }),
    ))
}
