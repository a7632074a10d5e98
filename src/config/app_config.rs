//! Application configuration structures
//!
//! This module contains the main configuration structures for the application.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use validator::Validate;

use crate::shared::error::{AppError, AppResult};

/// Non-secret signing key used when no key is configured. Development only.
pub const DEBUG_TOKEN_KEY: &str = "auth-dev-token-key";

/// User id every request is authenticated as in fake mode
pub const FAKE_USER_ID: u64 = 1;

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Server address to bind to
    pub bind_address: IpAddr,

    /// Server port
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,
}

/// Token validation configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TokenConfig {
    /// HMAC key the access tokens are signed with
    #[validate(length(min = 1))]
    pub secret_key: String,

    /// Longest lifetime of any token the issuer hands out, in seconds
    #[validate(range(min = 1, max = 86400))]
    pub max_lifetime_seconds: u64,

    /// Expected issuer; not checked when absent
    pub issuer: Option<String>,

    /// Expected audience; not checked when absent
    pub audience: Option<String>,

    /// Clock skew tolerated on `exp`/`nbf`, in seconds
    #[validate(range(max = 300))]
    pub leeway_seconds: u64,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// Authenticate every request as user 1 and skip revocation entirely.
    /// Local development only.
    pub fake: bool,

    /// Header carrying the `bearer <token>` credential
    #[validate(length(min = 1))]
    pub header_name: String,

    /// Token validation settings
    #[validate(nested)]
    pub token: TokenConfig,
}

/// Revocation log maintenance configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RevocationConfig {
    /// How often old revocations are pruned (seconds)
    #[validate(range(min = 1, max = 86400))]
    pub prune_interval_seconds: u64,

    /// How long a revocation stays in the log (seconds).
    /// Must exceed the max token lifetime.
    #[validate(range(min = 1, max = 604800))]
    pub retention_seconds: u64,

    /// Pause before retrying a failed logout event read (seconds)
    #[validate(range(min = 1, max = 300))]
    pub ingest_retry_seconds: u64,

    /// Shared secret `POST /internal/logout` callers must send in
    /// `X-Logout-Secret`. Unset leaves the route open to anyone who can reach it.
    #[serde(default)]
    #[validate(length(min = 16))]
    pub notify_secret: Option<String>,
}

impl RevocationConfig {
    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_seconds)
    }

    pub fn retention_window(&self) -> Duration {
        Duration::from_secs(self.retention_seconds)
    }

    pub fn ingest_retry(&self) -> Duration {
        Duration::from_secs(self.ingest_retry_seconds)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level
    #[validate(length(min = 1))]
    pub level: String,

    /// Log format ("json" or "text")
    #[validate(length(min = 1))]
    pub format: String,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Revocation log configuration
    pub revocation: RevocationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([127, 0, 0, 1]),
            port: 9012,
        }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret_key: DEBUG_TOKEN_KEY.to_string(),
            max_lifetime_seconds: 600, // 10 minutes
            issuer: None,
            audience: None,
            leeway_seconds: 0,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            fake: false,
            header_name: "Authentication".to_string(),
            token: TokenConfig::default(),
        }
    }
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            prune_interval_seconds: 5 * 60,
            retention_seconds: 15 * 60,
            ingest_retry_seconds: 1,
            notify_secret: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            revocation: RevocationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    ///
    /// Sources, later ones winning: built-in defaults, `Conf.toml` (optional),
    /// `SESSION_GUARD__SECTION__KEY` environment variables.
    pub fn load() -> AppResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("Conf").required(false))
            .add_source(config::Environment::with_prefix("SESSION_GUARD").separator("__"));
        Self::from_builder(builder)
    }

    /// Load configuration from a TOML document layered over the defaults
    pub fn from_toml_str(toml: &str) -> AppResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml));
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> AppResult<Self> {
        let defaults = config::Config::try_from(&AppConfig::default())
            .map_err(|e| AppError::Config(format!("Failed to encode defaults: {}", e)))?;

        let config = config::Config::builder()
            .add_source(defaults)
            .add_source(
                builder
                    .build()
                    .map_err(|e| AppError::Config(format!("Failed to build configuration: {}", e)))?,
            )
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build configuration: {}", e)))?;

        let config: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::Config(format!("Failed to deserialize configuration: {}", e)))?;

        config
            .validate_config()
            .map_err(|e| AppError::Validation(format!("Configuration validation failed: {}", e)))?;

        crate::config::ConfigValidator::validate_config(&config)?;

        Ok(config)
    }

    /// Validate each section with its field-level rules
    pub fn validate_config(&self) -> Result<(), validator::ValidationErrors> {
        self.server.validate()?;
        self.auth.validate()?;
        self.revocation.validate()?;
        self.logging.validate()?;
        Ok(())
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}
