// src/handlers/attempts.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use super::require_entitlement;
use crate::{
    error::AppError,
    models::attempt::{AnswerRequest, GoToRequest, StartAttemptRequest},
    state::AppState,
    utils::jwt::Claims,
};

/// Starts an attempt on a subject.
///
/// Runs the entitlement gate, loads and shuffles a fresh bank, and returns
/// the first question. A subject without questions answers 404 `empty_bank`.
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user, access) = require_entitlement(&state, &claims).await?;
    tracing::debug!("User {} admitted: {:?}", user.id, access);

    let view = state
        .attempts
        .start(user.id, payload.subject_id, payload.mode)
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.attempts.view(claims.user_id()?, id).await?;
    Ok(Json(view))
}

/// Records the caller's choice for a question. The latest choice wins.
pub async fn answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let view = state
        .attempts
        .select_answer(claims.user_id()?, id, payload.question_id, payload.choice)
        .await?;

    Ok(Json(view))
}

/// Moves to the next question, finishing the attempt after the last one.
pub async fn advance(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.attempts.advance(claims.user_id()?, id).await?;
    Ok(Json(view))
}

pub async fn previous(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let view = state.attempts.previous(claims.user_id()?, id).await?;
    Ok(Json(view))
}

pub async fn go_to(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GoToRequest>,
) -> Result<impl IntoResponse, AppError> {
    let view = state
        .attempts
        .go_to(claims.user_id()?, id, payload.index)
        .await?;
    Ok(Json(view))
}

/// Finishes the attempt and returns the scored result.
///
/// Calling it again returns the same result. `saved: false` means the result
/// could not be stored; the score itself is still valid.
pub async fn finish(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.attempts.finish(claims.user_id()?, id).await?;
    Ok(Json(outcome))
}

/// Per-question review with correct answers and explanations.
/// Only available once the attempt is finished, and behind the gate.
pub async fn review(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (user, _) = require_entitlement(&state, &claims).await?;
    let items = state.attempts.review(user.id, id).await?;
    Ok(Json(items))
}

/// Abandons the attempt. Nothing is saved and any countdown stops.
pub async fn abandon(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.attempts.abandon(claims.user_id()?, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
