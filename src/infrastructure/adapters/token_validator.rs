//! JWT token validator
//!
//! HS256 access tokens carrying the user id in `os_uid` and the session id in `sid`.

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, get_current_timestamp, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::app_config::TokenConfig;
use crate::domain::ports::{TokenError, TokenValidator};
use crate::domain::session::{Session, UserId};

/// Claims of an access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id; 0 means anonymous
    #[serde(default)]
    pub os_uid: UserId,

    /// Session id the token was issued for
    #[serde(default)]
    pub sid: String,

    /// Expiration time
    pub exp: u64,

    /// Not before
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,

    /// Issued at
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Validates HS256 access tokens against a shared secret
///
/// Tokens living longer than `max_lifetime_seconds` are refused: the revocation
/// log only remembers a logout for the retention window, which is sized
/// against that lifetime.
pub struct JwtTokenValidator {
    key: DecodingKey,
    validation: Validation,
    max_lifetime: u64,
}

impl JwtTokenValidator {
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = config.leeway_seconds;
        validation.validate_nbf = true;

        match &config.issuer {
            Some(issuer) => validation.set_issuer(&[issuer]),
            None => validation.iss = None,
        }
        match &config.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Self {
            key: DecodingKey::from_secret(config.secret_key.as_bytes()),
            validation,
            max_lifetime: config.max_lifetime_seconds.saturating_add(config.leeway_seconds),
        }
    }
}

impl JwtTokenValidator {
    fn check_lifetime(&self, claims: &AccessClaims) -> Result<(), TokenError> {
        let remaining = claims.exp.saturating_sub(get_current_timestamp());
        if remaining > self.max_lifetime {
            return Err(TokenError::Invalid(format!(
                "token expires in {}s, longer than the allowed {}s",
                remaining, self.max_lifetime
            )));
        }

        if let Some(iat) = claims.iat {
            let lifetime = claims.exp.saturating_sub(iat);
            if lifetime > self.max_lifetime {
                return Err(TokenError::Invalid(format!(
                    "token lifetime {}s exceeds the allowed {}s",
                    lifetime, self.max_lifetime
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TokenValidator for JwtTokenValidator {
    async fn validate(&self, credential: &str) -> Result<Session, TokenError> {
        let token_data = decode::<AccessClaims>(credential, &self.key, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature | ErrorKind::ImmatureSignature => TokenError::Expired,
                _ => {
                    debug!("JWT validation failed: {}", e);
                    TokenError::Invalid(format!("JWT validation failed: {}", e))
                }
            })?;

        let claims = token_data.claims;
        self.check_lifetime(&claims)?;

        if claims.os_uid != 0 && claims.sid.is_empty() {
            return Err(TokenError::Invalid("token carries no session id".to_string()));
        }

        Ok(Session::new(claims.os_uid, claims.sid))
    }
}
