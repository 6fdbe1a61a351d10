// src/handlers/catalog.rs

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::catalog::{
        CreateSubjectRequest, FacultyRequest, SubjectDetail, SubjectListParams,
        UpdateSubjectRequest,
    },
    state::AppState,
    utils::html::clean_html,
};

/// Lists all faculties, alphabetically.
pub async fn list_faculties(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let faculties = state.catalog.list_faculties().await?;
    Ok(Json(faculties))
}

/// Lists subjects, optionally restricted to one faculty.
pub async fn list_subjects(
    State(state): State<AppState>,
    Query(params): Query<SubjectListParams>,
) -> Result<impl IntoResponse, AppError> {
    let subjects = state.catalog.list_subjects(params.faculty_id).await?;
    Ok(Json(subjects))
}

/// Retrieves one subject with the size of its question bank.
pub async fn get_subject(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let subject = state
        .catalog
        .get_subject(id)
        .await?
        .ok_or(AppError::NotFound(format!("Subject {} not found", id)))?;

    let question_count = state.questions.count_by_subject(id).await?;

    Ok(Json(SubjectDetail {
        subject,
        question_count,
    }))
}

/// Creates a faculty.
/// Admin only.
pub async fn create_faculty(
    State(state): State<AppState>,
    Json(payload): Json<FacultyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let faculty = state
        .catalog
        .create_faculty(&clean_html(payload.name.trim()))
        .await?;
    tracing::info!("Created faculty {} ({})", faculty.id, faculty.name);

    Ok((StatusCode::CREATED, Json(faculty)))
}

/// Renames a faculty.
/// Admin only.
pub async fn rename_faculty(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<FacultyRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let faculty = state
        .catalog
        .rename_faculty(id, &clean_html(payload.name.trim()))
        .await?
        .ok_or(AppError::NotFound(format!("Faculty {} not found", id)))?;

    Ok(Json(faculty))
}

/// Deletes a faculty together with its subjects and questions.
/// Admin only.
pub async fn delete_faculty(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.catalog.delete_faculty(id).await? {
        return Err(AppError::NotFound(format!("Faculty {} not found", id)));
    }
    tracing::info!("Deleted faculty {}", id);

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a subject inside a faculty.
/// Admin only.
pub async fn create_subject(
    State(state): State<AppState>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let subject = state
        .catalog
        .create_subject(&clean_html(payload.name.trim()), payload.faculty_id)
        .await?;
    tracing::info!("Created subject {} ({})", subject.id, subject.name);

    Ok((StatusCode::CREATED, Json(subject)))
}

/// Updates a subject's name or faculty.
/// Admin only.
pub async fn update_subject(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let payload = UpdateSubjectRequest {
        name: payload.name.as_deref().map(|name| clean_html(name.trim())),
        faculty_id: payload.faculty_id,
    };

    let subject = state
        .catalog
        .update_subject(id, &payload)
        .await?
        .ok_or(AppError::NotFound(format!("Subject {} not found", id)))?;

    Ok(Json(subject))
}

/// Deletes a subject, its questions and its results.
/// Admin only.
pub async fn delete_subject(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !state.catalog.delete_subject(id).await? {
        return Err(AppError::NotFound(format!("Subject {} not found", id)));
    }
    tracing::info!("Deleted subject {}", id);

    Ok(StatusCode::NO_CONTENT)
}
