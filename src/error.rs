// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

use crate::{entitlement::Denial, session::SessionError};

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable (transient store failure, user may retry)
    StoreUnavailable(String),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (no active subscription)
    Unentitled(String),

    // 403 Forbidden (role check)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 404 Not Found, terminal: the subject has no questions
    EmptyBank(String),

    // 409 Conflict (e.g., duplicate email)
    Conflict(String),
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::InternalServerError(_) => "internal_error",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::BadRequest(_) => "bad_request",
            AppError::AuthError(_) => "unauthenticated",
            AppError::Unentitled(_) => "subscription_required",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::EmptyBank(_) => "empty_bank",
            AppError::Conflict(_) => "conflict",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::StoreUnavailable(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Content is temporarily unavailable, please reload".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Unentitled(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::EmptyBank(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };
        let body = Json(json!({
            "error": error_message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Failures reported by the storage collaborators.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store failure: {0}")]
    Backend(String),
}

/// Converts `sqlx::Error` into a `StoreError`.
/// Unique violations (Postgres code 23505) become conflicts.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                StoreError::Conflict(db.message().to_string())
            }
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23503") => {
                StoreError::NotFound(db.message().to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::Backend(msg) => AppError::StoreUnavailable(msg),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::EmptyBank(subject_id) => AppError::EmptyBank(format!(
                "Subject {} has no questions yet",
                subject_id
            )),
            SessionError::Store(store) => store.into(),
            SessionError::NotStarted => {
                AppError::BadRequest("Attempt has not started".to_string())
            }
            SessionError::AlreadyStarted => {
                AppError::Conflict("Attempt has already started".to_string())
            }
            SessionError::NotFinished => {
                AppError::Conflict("Finish the attempt before reviewing it".to_string())
            }
            SessionError::UnknownAttempt(id) => {
                AppError::NotFound(format!("Attempt {} not found", id))
            }
            SessionError::InvalidAnswer(msg) => AppError::BadRequest(msg),
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Unauthenticated => AppError::AuthError("Sign in to continue".to_string()),
            Denial::Unentitled => AppError::Unentitled(
                "An active subscription is required to take tests".to_string(),
            ),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
