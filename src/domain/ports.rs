//! Collaborators the session guard talks to
//!
//! Token parsing, the logout notification transport and incident reporting
//! live outside this crate; these traits are the seams they plug into.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::session::Session;
use crate::shared::error::{AppError, AppResult};

/// Why a credential was not accepted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Expired or not yet valid. The client should refresh the token.
    #[error("token expired")]
    Expired,

    #[error("{0}")]
    Invalid(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Invalid(reason) => AppError::InvalidCredential(reason),
        }
    }
}

/// Verifies a bearer credential and extracts the session it belongs to
#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate(&self, credential: &str) -> Result<Session, TokenError>;
}

/// Source of "session X was logged out" notifications.
///
/// `next_batch` blocks until at least one session id is available. Delivery is
/// at-least-once, so the same id may come back more than once. When `cancel`
/// fires the call should return `AppError::ContextCanceled`.
#[async_trait]
pub trait LogoutEventSource: Send + Sync {
    async fn next_batch(&self, cancel: &CancellationToken) -> AppResult<Vec<String>>;
}

/// Receives non-fatal failures from background tasks
pub trait ErrorHandler: Send + Sync {
    fn report(&self, error: &AppError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&AppError) + Send + Sync,
{
    fn report(&self, error: &AppError) {
        self(error)
    }
}
