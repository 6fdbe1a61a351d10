// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use validator::Validate;

use crate::{
    config::RESULT_HISTORY_LIMIT,
    error::AppError,
    models::user::{GrantSubscriptionRequest, SubscriptionPlan},
    state::AppState,
    utils::jwt::Claims,
};

/// Lists all users in the system.
/// Admin only.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.users.list_users().await?;
    Ok(Json(users))
}

/// Recent results of one user.
/// Admin only.
pub async fn user_results(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or(AppError::NotFound(format!("User {} not found", id)))?;

    let results = state
        .results
        .list_results(id, Some(RESULT_HISTORY_LIMIT))
        .await?;

    Ok(Json(results))
}

/// Grants or revokes a subscription.
///
/// Paid plans expire `days` days from now. The free plan clears the expiry.
/// The change applies to the very next gate check.
/// Admin only.
pub async fn grant_subscription(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<GrantSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let expires_at = match (payload.plan, payload.days) {
        (SubscriptionPlan::Free, _) => None,
        (_, Some(days)) => Some(Utc::now() + Duration::days(days)),
        (_, None) => {
            return Err(AppError::BadRequest(
                "days is required for a paid plan".to_string(),
            ));
        }
    };

    let user = state
        .users
        .update_subscription(id, payload.plan, expires_at)
        .await?
        .ok_or(AppError::NotFound(format!("User {} not found", id)))?;

    tracing::info!(
        "Subscription of user {} set to {} until {:?}",
        user.id,
        user.subscription_plan.as_str(),
        user.subscription_expires_at
    );

    Ok(Json(user))
}

/// Deletes a user and their results.
/// Admin only.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if claims.user_id()? == id {
        return Err(AppError::BadRequest(
            "Administrators cannot delete their own account".to_string(),
        ));
    }

    if !state.users.delete_user(id).await? {
        return Err(AppError::NotFound(format!("User {} not found", id)));
    }
    tracing::info!("Deleted user {}", id);

    Ok(StatusCode::NO_CONTENT)
}
