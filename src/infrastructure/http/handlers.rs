//! Request handlers
//!
//! Every authenticated handler follows the same shape: authenticate, attach
//! the user to the request extensions, then do the work inside the
//! authenticated context so a logout aborts it.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use warp::http::{Extensions, HeaderMap, StatusCode};
use warp::reply::Response;
use warp::Reply;

use crate::application::services::{AuthenticatedContext, Authenticator};
use crate::infrastructure::adapters::LogoutNotifier;
use crate::infrastructure::http::responses::ResponseFormatter;
use crate::shared::error::AppError;
use crate::shared::logging::LoggingUtils;
use crate::shared::metrics::RevocationMetrics;

/// Longest hold a `/watch` request may ask for
pub const MAX_WATCH_SECONDS: u64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct WatchQuery {
    pub seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutRequest {
    pub session_ids: Vec<String>,
}

/// Handle health check requests
pub async fn handle_health_request() -> Result<Response, Infallible> {
    Ok(ResponseFormatter::json(
        &serde_json::json!({ "status": "healthy" }),
        StatusCode::OK,
    ))
}

/// Return the id of the authenticated user
pub async fn handle_whoami_request(
    authenticator: Arc<Authenticator>,
    headers: HeaderMap,
    shutdown: CancellationToken,
) -> Result<Response, Infallible> {
    let request_id = LoggingUtils::generate_request_id();
    let span = info_span!("whoami", request_id = %request_id);

    async move {
        let ctx = match authenticate(&authenticator, &headers, &shutdown, &request_id).await {
            Ok(ctx) => ctx,
            Err(response) => return Ok(response),
        };

        let mut extensions = Extensions::new();
        ctx.attach(&mut extensions);
        let user_id = authenticator.from_context(&extensions);

        Ok(ResponseFormatter::json(
            &serde_json::json!({ "user_id": user_id }),
            StatusCode::OK,
        ))
    }
    .instrument(span)
    .await
}

/// Hold the request open for a while; a logout in the meantime aborts it
pub async fn handle_watch_request(
    authenticator: Arc<Authenticator>,
    headers: HeaderMap,
    query: WatchQuery,
    shutdown: CancellationToken,
) -> Result<Response, Infallible> {
    let request_id = LoggingUtils::generate_request_id();
    let span = info_span!("watch", request_id = %request_id);

    async move {
        let ctx = match authenticate(&authenticator, &headers, &shutdown, &request_id).await {
            Ok(ctx) => ctx,
            Err(response) => return Ok(response),
        };

        let seconds = query.seconds.unwrap_or(30).min(MAX_WATCH_SECONDS);
        let outcome = ctx
            .run_until_cancelled(tokio::time::sleep(Duration::from_secs(seconds)))
            .await;

        match outcome {
            Ok(()) => Ok(ResponseFormatter::json(
                &serde_json::json!({ "user_id": ctx.user_id(), "completed": true }),
                StatusCode::OK,
            )),
            Err(err) => {
                info!(error = %err, "Request aborted");
                Ok(ResponseFormatter::error(&err))
            }
        }
    }
    .instrument(span)
    .await
}

/// Header carrying the shared secret for `POST /internal/logout`
pub const LOGOUT_SECRET_HEADER: &str = "X-Logout-Secret";

/// Accept logout notifications and hand them to the ingestor.
///
/// In fake mode nothing drains the channel, so batches are dropped.
pub async fn handle_logout_request(
    authenticator: Arc<Authenticator>,
    notifier: LogoutNotifier,
    headers: HeaderMap,
    request: LogoutRequest,
) -> Result<Response, Infallible> {
    if let Some(secret) = &authenticator.config().revocation.notify_secret {
        let presented = headers
            .get(LOGOUT_SECRET_HEADER)
            .map(|value| value.as_bytes())
            .unwrap_or_default();
        if !secrets_match(presented, secret.as_bytes()) {
            warn!("Rejected logout notification with a missing or wrong secret");
            return Ok(ResponseFormatter::error(&AppError::InvalidCredential(
                "logout secret mismatch".to_string(),
            )));
        }
    }

    if authenticator.is_fake() {
        debug!(count = request.session_ids.len(), "Fake mode, dropping logout notification");
        return Ok(ResponseFormatter::json(
            &serde_json::json!({ "accepted": 0 }),
            StatusCode::ACCEPTED,
        ));
    }

    let count = request.session_ids.len();
    match notifier.notify(request.session_ids).await {
        Ok(()) => Ok(ResponseFormatter::json(
            &serde_json::json!({ "accepted": count }),
            StatusCode::ACCEPTED,
        )),
        Err(err) => Ok(ResponseFormatter::error(&err)),
    }
}

/// Length-independent comparison that does not stop at the first differing byte
fn secrets_match(presented: &[u8], expected: &[u8]) -> bool {
    let mut diff = presented.len() ^ expected.len();
    for (i, byte) in expected.iter().enumerate() {
        diff |= (presented.get(i).copied().unwrap_or(0) ^ byte) as usize;
    }
    diff == 0
}

/// Handle Prometheus metrics requests
pub async fn handle_metrics_request(metrics: Arc<RevocationMetrics>) -> Result<Response, Infallible> {
    match metrics.gather_text() {
        Ok(text) => Ok(warp::reply::with_header(
            warp::reply::with_status(text, StatusCode::OK),
            "Content-Type",
            "text/plain; version=0.0.4; charset=utf-8",
        )
        .into_response()),
        Err(err) => Ok(ResponseFormatter::error(&err)),
    }
}

async fn authenticate(
    authenticator: &Authenticator,
    headers: &HeaderMap,
    shutdown: &CancellationToken,
    request_id: &str,
) -> Result<AuthenticatedContext, Response> {
    match authenticator.authenticate(headers, shutdown).await {
        Ok(ctx) => {
            LoggingUtils::log_authenticated(request_id, ctx.user_id(), ctx.is_watched());
            Ok(ctx)
        }
        Err(err) => {
            LoggingUtils::log_rejected(request_id, &err);
            Err(ResponseFormatter::error(&err))
        }
    }
}
