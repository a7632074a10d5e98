//! Logging utilities module
//!
//! This module provides centralized logging functionality and utilities.

use tracing::{info, warn};
use uuid::Uuid;

use crate::shared::error::{AppError, AppResult};

/// Logging utilities for the application
pub struct LoggingUtils;

impl LoggingUtils {
    /// Initialize logging with the specified configuration
    ///
    /// `RUST_LOG` takes precedence over `level` when it is set.
    pub fn initialize(level: &str, format: &str) -> AppResult<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level));

        let builder = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let result = if format == "json" {
            tracing::subscriber::set_global_default(builder.json().finish())
        } else {
            tracing::subscriber::set_global_default(builder.finish())
        };

        result.map_err(|e| AppError::Internal(format!("Failed to initialize logging: {}", e)))
    }

    /// Log a successful authentication
    pub fn log_authenticated(request_id: &str, user_id: u64, watched: bool) {
        info!(
            request_id = %request_id,
            user_id = %user_id,
            watched = watched,
            "Request authenticated"
        );
    }

    /// Log a rejected authentication
    pub fn log_rejected(request_id: &str, error: &AppError) {
        match error {
            // Expiry is routine; the client refreshes and retries
            AppError::TokenExpired => info!(
                request_id = %request_id,
                "Rejected expired token"
            ),
            other => warn!(
                request_id = %request_id,
                error = %other,
                "Authentication rejected"
            ),
        }
    }

    /// Generate a unique request ID
    pub fn generate_request_id() -> String {
        format!("req_{}", Uuid::new_v4().simple())
    }
}
