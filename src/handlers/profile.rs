// src/handlers/profile.rs

use axum::{
    Json,
    extract::{Extension, State},
    response::IntoResponse,
};
use chrono::Utc;

use super::current_user;
use crate::{
    entitlement::can_enter,
    error::AppError,
    models::user::MeResponse,
    state::AppState,
    utils::jwt::Claims,
};

/// Current user's profile plus the live entitlement decision.
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = current_user(&state, &claims).await?;
    let can_take_tests = can_enter(Some(&user), &state.operators, Utc::now());

    Ok(Json(MeResponse {
        user,
        can_take_tests,
    }))
}
