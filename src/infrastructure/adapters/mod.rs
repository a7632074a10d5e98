//! Infrastructure adapters module
//!
//! Concrete implementations behind the domain ports, plus the in-memory
//! revocation log itself.

pub mod logout_source;
pub mod revocation_log;
pub mod token_validator;

pub use logout_source::{ChannelLogoutSource, LogoutNotifier};
pub use revocation_log::RevocationLog;
pub use token_validator::{AccessClaims, JwtTokenValidator};
