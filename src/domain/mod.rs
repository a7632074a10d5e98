//! Domain layer - Core models and collaborator interfaces
//!
//! This module contains the session and revocation models plus the traits
//! external collaborators implement. It is independent of HTTP and of the
//! concrete token format.

pub mod ports;
pub mod revocation;
pub mod session;

pub use ports::{ErrorHandler, LogoutEventSource, TokenError, TokenValidator};
pub use revocation::{Cursor, RevocationEntry};
pub use session::{Session, UserId, ANONYMOUS_USER_ID};
