// src/handlers/mod.rs

pub mod admin;
pub mod attempts;
pub mod auth;
pub mod catalog;
pub mod profile;
pub mod questions;
pub mod results;

use chrono::Utc;

use crate::{
    entitlement::{self, Access},
    error::AppError,
    models::user::User,
    state::AppState,
    utils::jwt::Claims,
};

/// Loads the caller's record from the user store.
/// A token whose user no longer exists is treated as signed out.
pub(crate) async fn current_user(state: &AppState, claims: &Claims) -> Result<User, AppError> {
    let user_id = claims.user_id()?;
    state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::AuthError("Account no longer exists".to_string()))
}

/// Runs the entitlement gate against a freshly loaded user.
pub(crate) async fn require_entitlement(
    state: &AppState,
    claims: &Claims,
) -> Result<(User, Access), AppError> {
    let user = state.users.find_by_id(claims.user_id()?).await?;
    let access = entitlement::evaluate(user.as_ref(), &state.operators, Utc::now())?;

    // evaluate() only grants access to a present user.
    let user = user.ok_or_else(|| AppError::AuthError("Sign in to continue".to_string()))?;
    Ok((user, access))
}
