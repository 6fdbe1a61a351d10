// src/handlers/auth.rs

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    error::{AppError, StoreError},
    models::user::{CreateUserRequest, LoginRequest, NewUser, UserRole},
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
    },
};

/// Registers a new student account on the free plan.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let email = payload.email.trim().to_lowercase();
    let hashed_password = hash_password(&payload.password)?;

    let user = state
        .users
        .create_user(NewUser {
            email: email.clone(),
            password_hash: hashed_password,
            display_name: payload.display_name.trim().to_string(),
            role: UserRole::Student,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => {
                AppError::Conflict(format!("Email '{}' is already registered", email))
            }
            other => {
                tracing::error!("Failed to register user: {:?}", other);
                AppError::from(other)
            }
        })?;

    tracing::info!("Registered user {} ({})", user.id, user.email);

    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates a user and returns a JWT token.
///
/// The token carries identity only; subscription state is read from the
/// user store on every protected request.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::AuthError("Invalid email or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        tracing::warn!("Failed login for {}", email);
        return Err(AppError::AuthError("Invalid email or password".to_string()));
    }

    let token = sign_jwt(
        user.id,
        &user.email,
        user.role,
        &state.config.jwt_secret,
        state.config.jwt_expiration,
    )?;

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "role": user.role,
    })))
}
