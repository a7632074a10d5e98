//! Session Guard - cancels in-flight work for logged-out sessions
//!
//! Logout notifications are appended to an in-memory revocation log. Every
//! authenticated request gets a cancelable context, and a watcher task follows
//! the log and cancels that context when the request's session is logged out.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

#[cfg(test)]
mod tests;

pub use application::services::{AuthenticatedContext, Authenticator, LogoutIngestor, Pruner};
pub use config::AppConfig;
pub use infrastructure::adapters::{ChannelLogoutSource, JwtTokenValidator, LogoutNotifier, RevocationLog};
pub use infrastructure::http::HttpServer;
pub use shared::error::{AppError, AppResult};
