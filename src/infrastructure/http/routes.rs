//! Route configuration

use std::convert::Infallible;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use warp::Filter;

use crate::application::services::Authenticator;
use crate::infrastructure::adapters::LogoutNotifier;
use crate::infrastructure::http::handlers::{
    handle_health_request, handle_logout_request, handle_metrics_request, handle_watch_request,
    handle_whoami_request, WatchQuery,
};
use crate::infrastructure::http::responses::handle_rejection;
use crate::infrastructure::http::utils::{with_authenticator, with_metrics, with_notifier, with_shutdown};
use crate::shared::metrics::RevocationMetrics;

/// Largest accepted logout notification body
const MAX_LOGOUT_BODY_BYTES: u64 = 64 * 1024;

/// Route builder
pub struct RouteBuilder;

impl RouteBuilder {
    /// Build all routes
    pub fn build_routes(
        authenticator: Arc<Authenticator>,
        notifier: LogoutNotifier,
        metrics: Arc<RevocationMetrics>,
        shutdown: CancellationToken,
    ) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .and_then(handle_health_request);

        let whoami = warp::path("whoami")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_authenticator(authenticator.clone()))
            .and(warp::header::headers_cloned())
            .and(with_shutdown(shutdown.clone()))
            .and_then(handle_whoami_request);

        let watch = warp::path("watch")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_authenticator(authenticator.clone()))
            .and(warp::header::headers_cloned())
            .and(warp::query::<WatchQuery>())
            .and(with_shutdown(shutdown))
            .and_then(handle_watch_request);

        // Guarded by `revocation.notify_secret` when configured; otherwise rely
        // on the loopback-only default bind address.
        let logout = warp::path!("internal" / "logout")
            .and(warp::post())
            .and(with_authenticator(authenticator))
            .and(with_notifier(notifier))
            .and(warp::header::headers_cloned())
            .and(warp::body::content_length_limit(MAX_LOGOUT_BODY_BYTES))
            .and(warp::body::json())
            .and_then(handle_logout_request);

        let metrics = warp::path("metrics")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_metrics(metrics))
            .and_then(handle_metrics_request);

        health
            .or(whoami)
            .or(watch)
            .or(logout)
            .or(metrics)
            .recover(handle_rejection)
    }
}
