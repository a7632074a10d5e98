//! Common test utilities and fakes
//!
//! Shared helpers used by unit tests and the integration suite.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use warp::http::HeaderMap;

use crate::application::services::Authenticator;
use crate::config::app_config::TokenConfig;
use crate::config::AppConfig;
use crate::domain::ports::{TokenError, TokenValidator};
use crate::domain::session::{Session, UserId};
use crate::infrastructure::adapters::{AccessClaims, RevocationLog};
use crate::shared::metrics::RevocationMetrics;

/// Token validator answering from a fixed table.
///
/// Unknown credentials are rejected as invalid.
#[derive(Default)]
pub struct StaticTokenValidator {
    answers: HashMap<String, Result<Session, TokenError>>,
}

impl StaticTokenValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, credential: &str, user_id: UserId, session_id: &str) -> Self {
        self.answers
            .insert(credential.to_string(), Ok(Session::new(user_id, session_id)));
        self
    }

    pub fn with_error(mut self, credential: &str, error: TokenError) -> Self {
        self.answers.insert(credential.to_string(), Err(error));
        self
    }
}

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    async fn validate(&self, credential: &str) -> Result<Session, TokenError> {
        self.answers
            .get(credential)
            .cloned()
            .unwrap_or_else(|| Err(TokenError::Invalid(format!("unknown credential {}", credential))))
    }
}

/// Headers carrying `token` the way clients send it
pub fn bearer_headers(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "Authentication",
        format!("Bearer {}", token).parse().expect("valid header value"),
    );
    headers
}

/// Authenticator over a fresh log with default configuration
pub fn test_authenticator(validator: StaticTokenValidator) -> Authenticator {
    authenticator_with_config(AppConfig::default(), validator)
}

pub fn authenticator_with_config(config: AppConfig, validator: StaticTokenValidator) -> Authenticator {
    Authenticator::new(
        Arc::new(config),
        Arc::new(validator),
        Arc::new(RevocationLog::new()),
        Arc::new(RevocationMetrics::new().expect("metrics registry")),
    )
}

/// Sign an access token valid for `ttl_seconds` with the configured secret
pub fn sign_token(config: &TokenConfig, user_id: UserId, session_id: &str, ttl_seconds: i64) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs() as i64;

    let claims = AccessClaims {
        os_uid: user_id,
        sid: session_id.to_string(),
        exp: (now + ttl_seconds).max(0) as u64,
        nbf: None,
        iat: Some(now as u64),
        iss: config.issuer.clone(),
        aud: config.audience.clone(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret_key.as_bytes()),
    )
    .expect("token signing")
}
