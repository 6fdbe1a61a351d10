// src/handlers/results.rs

use axum::{
    Json,
    extract::{Extension, State},
    response::IntoResponse,
};

use crate::{
    config::RESULT_HISTORY_LIMIT,
    error::AppError,
    models::result::ResultStats,
    state::AppState,
    utils::jwt::Claims,
};

/// The caller's most recent results, newest first.
pub async fn list_results(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results = state
        .results
        .list_results(claims.user_id()?, Some(RESULT_HISTORY_LIMIT))
        .await?;

    Ok(Json(results))
}

/// Aggregate statistics over all of the caller's results.
pub async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let results = state.results.list_results(claims.user_id()?, None).await?;
    Ok(Json(ResultStats::from_results(&results)))
}
