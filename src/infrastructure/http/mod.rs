//! HTTP infrastructure module
//!
//! This module contains the HTTP surface: server wiring, routes, filters,
//! handlers and response formatting.

pub mod handlers;
pub mod responses;
pub mod routes;
pub mod server;
pub mod utils;

pub use handlers::{LogoutRequest, WatchQuery};
pub use responses::ResponseFormatter;
pub use routes::RouteBuilder;
pub use server::HttpServer;
