//! Feeds logout notifications into the revocation log

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::domain::ports::{ErrorHandler, LogoutEventSource};
use crate::infrastructure::adapters::RevocationLog;
use crate::shared::error::AppError;
use crate::shared::metrics::RevocationMetrics;

/// Pulls batches of revoked session ids and publishes them.
///
/// Failures are reported and retried after a fixed delay; only shutdown
/// ends the loop.
pub struct LogoutIngestor {
    log: Arc<RevocationLog>,
    source: Arc<dyn LogoutEventSource>,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    metrics: Arc<RevocationMetrics>,
    retry_delay: Duration,
}

impl LogoutIngestor {
    pub fn new(
        log: Arc<RevocationLog>,
        source: Arc<dyn LogoutEventSource>,
        metrics: Arc<RevocationMetrics>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            log,
            source,
            error_handler: None,
            metrics,
            retry_delay,
        }
    }

    pub fn with_error_handler(mut self, handler: Option<Arc<dyn ErrorHandler>>) -> Self {
        self.error_handler = handler;
        self
    }

    /// Run until `shutdown` is canceled
    #[instrument(skip_all, name = "logout_ingestor")]
    pub async fn run(self, shutdown: CancellationToken) {
        info!("Listening for logout events");

        loop {
            match self.source.next_batch(&shutdown).await {
                Ok(session_ids) => {
                    let count = session_ids.len();
                    let sequence = self.log.publish(session_ids).await;
                    self.metrics.record_published(count);
                    self.metrics.set_log_entries(self.log.len().await);
                    debug!(count, sequence, "Published logout events");
                }
                Err(AppError::ContextCanceled) => break,
                Err(_) if shutdown.is_cancelled() => break,
                Err(err) => {
                    let err = match err {
                        AppError::IngestFailure(_) => err,
                        other => AppError::IngestFailure(other.to_string()),
                    };
                    warn!(
                        error = %err,
                        retry_in_ms = self.retry_delay.as_millis() as u64,
                        "Failed to receive logout events"
                    );
                    self.metrics.record_ingest_failure();
                    if let Some(handler) = &self.error_handler {
                        handler.report(&err);
                    }

                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        info!("Logout ingestor stopped");
    }
}
