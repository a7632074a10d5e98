//! Configuration validation module
//!
//! Cross-field rules the validator derives cannot express.

use crate::config::app_config::{AppConfig, AuthConfig, RevocationConfig, DEBUG_TOKEN_KEY};
use crate::shared::error::{AppError, AppResult};

/// Configuration validator for additional validation logic
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the complete configuration
    pub fn validate_config(config: &AppConfig) -> AppResult<()> {
        Self::validate_retention(&config.auth, &config.revocation)?;
        Self::validate_prune_interval(&config.revocation)?;
        Self::validate_auth_config(&config.auth);
        Self::validate_notify_secret(config);
        Ok(())
    }

    /// A revocation may only be forgotten once every token of that session has expired
    fn validate_retention(auth: &AuthConfig, revocation: &RevocationConfig) -> AppResult<()> {
        if auth.fake {
            return Ok(());
        }

        if revocation.retention_seconds <= auth.token.max_lifetime_seconds {
            return Err(AppError::Validation(format!(
                "Revocation retention ({}s) must exceed the max token lifetime ({}s)",
                revocation.retention_seconds, auth.token.max_lifetime_seconds
            )));
        }

        Ok(())
    }

    fn validate_prune_interval(revocation: &RevocationConfig) -> AppResult<()> {
        if revocation.prune_interval_seconds > revocation.retention_seconds {
            return Err(AppError::Validation(
                "Prune interval cannot be longer than the retention window".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_auth_config(auth: &AuthConfig) {
        if auth.fake {
            tracing::warn!("Fake authentication is enabled - every request runs as user 1");
        } else if auth.token.secret_key == DEBUG_TOKEN_KEY {
            tracing::warn!("Using the development token key - do not run this in production");
        }
    }

    fn validate_notify_secret(config: &AppConfig) {
        if config.revocation.notify_secret.is_none() && !config.server.bind_address.is_loopback() {
            tracing::warn!(
                "POST /internal/logout is reachable without a secret on {}",
                config.server.bind_address
            );
        }
    }
}
