//! Infrastructure layer - External concerns and adapters
//!
//! This module contains the adapters for external collaborators and the
//! HTTP surface.

pub mod adapters;
pub mod http;

pub use adapters::{ChannelLogoutSource, JwtTokenValidator, LogoutNotifier, RevocationLog};
