//! Error handling module
//!
//! This module provides centralized error handling for the session guard.

use serde_json::Value;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// The credential was structurally valid but has expired (or is not valid yet).
    /// The caller is expected to refresh it.
    #[error("auth token is expired")]
    TokenExpired,

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("invalid session")]
    RevokedSession,

    #[error("receiving logout event: {0}")]
    IngestFailure(String),

    /// Not a failure: used to unwind receive loops and background tasks.
    #[error("context canceled")]
    ContextCanceled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error belongs to the request's authentication step
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            AppError::TokenExpired | AppError::InvalidCredential(_) | AppError::RevokedSession
        )
    }

    /// Stable machine-readable code for the error body
    pub fn code(&self) -> &'static str {
        match self {
            AppError::TokenExpired => "token_expired",
            AppError::InvalidCredential(_) => "invalid_credential",
            AppError::RevokedSession => "invalid_session",
            AppError::IngestFailure(_) => "ingest_failure",
            AppError::ContextCanceled => "context_canceled",
            AppError::Config(_) => "config_error",
            AppError::Validation(_) => "validation_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Convert to the JSON error body returned by the HTTP layer
    pub fn to_error_body(&self) -> Value {
        let message = match self {
            // Do not leak validator internals to clients
            AppError::InvalidCredential(_) => "Authentication failed".to_string(),
            AppError::Internal(_) | AppError::Config(_) => "Internal error".to_string(),
            other => other.to_string(),
        };

        serde_json::json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        })
    }

    /// Get HTTP status code for this error
    pub fn http_status_code(&self) -> warp::http::StatusCode {
        match self {
            AppError::TokenExpired
            | AppError::InvalidCredential(_)
            | AppError::RevokedSession => warp::http::StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => warp::http::StatusCode::BAD_REQUEST,
            // The client went away or the server is shutting down
            AppError::ContextCanceled => warp::http::StatusCode::SERVICE_UNAVAILABLE,
            _ => warp::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application result type
pub type AppResult<T> = Result<T, AppError>;

impl warp::reject::Reject for AppError {}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}
