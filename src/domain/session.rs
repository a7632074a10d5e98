//! Session identity produced by token validation

use serde::{Deserialize, Serialize};

/// Numeric user id; 0 is the anonymous (public) user
pub type UserId = u64;

/// User id of requests without a credential
pub const ANONYMOUS_USER_ID: UserId = 0;

/// Identity extracted from a validated credential.
///
/// Lives only as long as the request that presented the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub session_id: String,
}

impl Session {
    pub fn new(user_id: UserId, session_id: impl Into<String>) -> Self {
        Self {
            user_id,
            session_id: session_id.into(),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id == ANONYMOUS_USER_ID
    }
}
