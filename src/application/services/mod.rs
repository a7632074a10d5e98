//! Application services - the session guard and its background tasks

pub mod authenticator;
pub mod logout_ingestor;
pub mod pruner;

pub use authenticator::{AuthUser, AuthenticatedContext, Authenticator};
pub use logout_ingestor::LogoutIngestor;
pub use pruner::Pruner;
