//! Shared utilities and common functionality
//!
//! This module contains error handling, logging and metrics that are used
//! across the application.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{AppError, AppResult};
pub use logging::LoggingUtils;
pub use metrics::RevocationMetrics;
