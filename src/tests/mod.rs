//! Test suite for the session guard
//!
//! Shared fakes live in `common`; `integration` drives the HTTP routes end to
//! end. Unit tests sit next to the code they cover.

pub mod common;
pub mod integration;

/// Test configuration and utilities
pub mod config {
    use crate::config::AppConfig;
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Initialize test environment
    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("debug")
                .with_test_writer()
                .try_init();
        });
    }

    /// Create test configuration
    pub fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.token.secret_key = "integration-test-secret".to_string();
        config
    }

    /// Configuration with fake authentication enabled
    pub fn fake_config() -> AppConfig {
        let mut config = test_config();
        config.auth.fake = true;
        config
    }
}

/// Test result types
pub type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigValidator;

    #[test]
    fn test_config_initialization() {
        config::init();
        let test_config = config::test_config();
        assert!(!test_config.auth.fake);
        assert!(test_config.validate_config().is_ok());
        assert!(ConfigValidator::validate_config(&test_config).is_ok());
    }

    #[test]
    fn test_fake_config() {
        assert!(config::fake_config().auth.fake);
    }
}
