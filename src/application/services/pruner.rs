//! Periodic removal of old revocations

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::infrastructure::adapters::RevocationLog;
use crate::shared::metrics::RevocationMetrics;

/// Prunes entries older than the retention window on a fixed interval.
///
/// The retention window has to outlive every token the validator accepts,
/// otherwise a revoked but unexpired token would be let back in.
pub struct Pruner {
    log: Arc<RevocationLog>,
    metrics: Arc<RevocationMetrics>,
    interval: Duration,
    retention: Duration,
}

impl Pruner {
    pub fn new(
        log: Arc<RevocationLog>,
        metrics: Arc<RevocationMetrics>,
        interval: Duration,
        retention: Duration,
    ) -> Self {
        Self {
            log,
            metrics,
            interval,
            retention,
        }
    }

    /// Prune once, relative to the current time. Returns the removed count.
    pub async fn prune_now(&self) -> usize {
        let Some(before) = Instant::now().checked_sub(self.retention) else {
            // Monotonic clock younger than the retention window: nothing is old enough
            return 0;
        };

        let removed = self.log.prune(before).await;
        self.metrics.set_log_entries(self.log.len().await);
        removed
    }

    /// Run until `shutdown` is canceled. The first prune happens one interval in.
    #[instrument(skip_all, name = "revocation_pruner")]
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            retention_secs = self.retention.as_secs(),
            "Starting revocation pruner"
        );

        let mut tick = interval_at(Instant::now() + self.interval, self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tick.tick() => {
                    let removed = self.prune_now().await;
                    debug!(removed, "Pruned old revocations");
                }
            }
        }

        info!("Revocation pruner stopped");
    }
}
