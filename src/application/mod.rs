//! Application layer - Orchestration of the revocation core
//!
//! This module contains the authenticator that guards request contexts and
//! the background services that keep the revocation log fed and bounded.

pub mod services;

pub use services::*;
