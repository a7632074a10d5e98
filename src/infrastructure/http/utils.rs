//! HTTP utilities - Filters injecting shared state into handlers

use std::convert::Infallible;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use warp::Filter;

use crate::application::services::Authenticator;
use crate::infrastructure::adapters::LogoutNotifier;
use crate::shared::metrics::RevocationMetrics;

/// Helper function to inject the authenticator into route
pub fn with_authenticator(
    authenticator: Arc<Authenticator>,
) -> impl Filter<Extract = (Arc<Authenticator>,), Error = Infallible> + Clone {
    warp::any().map(move || authenticator.clone())
}

/// Helper function to inject the server-wide shutdown token into route
pub fn with_shutdown(
    shutdown: CancellationToken,
) -> impl Filter<Extract = (CancellationToken,), Error = Infallible> + Clone {
    warp::any().map(move || shutdown.clone())
}

/// Helper function to inject the logout notifier into route
pub fn with_notifier(
    notifier: LogoutNotifier,
) -> impl Filter<Extract = (LogoutNotifier,), Error = Infallible> + Clone {
    warp::any().map(move || notifier.clone())
}

/// Helper function to inject the metrics registry into route
pub fn with_metrics(
    metrics: Arc<RevocationMetrics>,
) -> impl Filter<Extract = (Arc<RevocationMetrics>,), Error = Infallible> + Clone {
    warp::any().map(move || metrics.clone())
}
