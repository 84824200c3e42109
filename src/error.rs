//! Error types for friendfeed
//!
//! All errors in the application are converted to `AppError`,
//! which implements `IntoResponse` for proper HTTP error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::validation::FieldError;

/// Application-wide error type
///
/// Domain failures have their own variants so callers can match on them;
/// each one maps onto a response category in `into_response`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Route or resource not found (404)
    #[error("Resource not found")]
    NotFound,

    /// Post absent or id malformed (404)
    #[error("post not found")]
    PostNotFound,

    /// User absent or id malformed (404)
    #[error("user not found")]
    UserNotFound,

    /// Email or phone already registered to another user (409)
    #[error("{0} already registered")]
    CredentialTaken(&'static str),

    /// One-time credential link already used (409)
    #[error("{0} already linked")]
    AlreadyLinked(&'static str),

    /// Friend edge exists in either direction (409)
    #[error("user already added as friend")]
    AlreadyFriends,

    /// No friend edge to delete (400)
    #[error("user is not a friend")]
    NotFriends,

    /// Adding or removing yourself (403)
    #[error("cannot add or remove yourself as a friend")]
    SelfFriend,

    /// Commenting without being the author or a friend of the author (403)
    #[error("only the author or friends of the author can comment")]
    NotFriendOfAuthor,

    /// Unknown credential or wrong password (401)
    #[error("credential or password is invalid")]
    InvalidCredentials,

    /// Missing, malformed or expired bearer token (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Field-level validation failures (400)
    #[error("Validation error")]
    Validation(Vec<FieldError>),

    /// Malformed request outside field validation (400)
    #[error("{0}")]
    BadRequest(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Object storage error (500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Status code and machine-readable category
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound | AppError::PostNotFound | AppError::UserNotFound => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            AppError::CredentialTaken(_) | AppError::AlreadyLinked(_) | AppError::AlreadyFriends => {
                (StatusCode::CONFLICT, "conflict")
            }
            AppError::SelfFriend | AppError::NotFriendOfAuthor => {
                (StatusCode::FORBIDDEN, "forbidden")
            }
            AppError::InvalidCredentials | AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "unauthorized")
            }
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            AppError::NotFriends | AppError::BadRequest(_) => {
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Config(_)
            | AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body. Internal failures never leak detail.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_type) = self.classify();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            tracing::debug!(error = %self, error_type, "Request rejected");
            self.to_string()
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let mut body = serde_json::json!({
            "error": error_type,
            "message": message,
        });
        if let AppError::Validation(fields) = &self {
            body["data"] = serde_json::json!(fields);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
