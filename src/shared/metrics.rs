//! Metrics utilities module
//!
//! Prometheus instruments for the revocation log and its consumers.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

use crate::shared::error::{AppError, AppResult};

/// Prometheus metrics for session revocation
pub struct RevocationMetrics {
    registry: Registry,
    revocations_published: IntCounter,
    sessions_revoked: IntCounter,
    ingest_failures: IntCounter,
    log_entries: IntGauge,
    active_watchers: IntGauge,
}

impl RevocationMetrics {
    /// Create a new metrics instance with its own registry
    pub fn new() -> AppResult<Self> {
        let registry = Registry::new();

        let revocations_published = IntCounter::new(
            "revocations_published_total",
            "Session ids published into the revocation log",
        )
        .map_err(metric_error)?;
        let sessions_revoked = IntCounter::new(
            "sessions_revoked_total",
            "Authenticated contexts canceled because their session was revoked",
        )
        .map_err(metric_error)?;
        let ingest_failures = IntCounter::new(
            "ingest_failures_total",
            "Failed attempts to read logout events",
        )
        .map_err(metric_error)?;
        let log_entries = IntGauge::new(
            "revocation_log_entries",
            "Entries currently retained in the revocation log",
        )
        .map_err(metric_error)?;
        let active_watchers = IntGauge::new(
            "active_session_watchers",
            "Watcher tasks currently following the revocation log",
        )
        .map_err(metric_error)?;

        registry.register(Box::new(revocations_published.clone())).map_err(metric_error)?;
        registry.register(Box::new(sessions_revoked.clone())).map_err(metric_error)?;
        registry.register(Box::new(ingest_failures.clone())).map_err(metric_error)?;
        registry.register(Box::new(log_entries.clone())).map_err(metric_error)?;
        registry.register(Box::new(active_watchers.clone())).map_err(metric_error)?;

        Ok(Self {
            registry,
            revocations_published,
            sessions_revoked,
            ingest_failures,
            log_entries,
            active_watchers,
        })
    }

    pub fn record_published(&self, count: usize) {
        self.revocations_published.inc_by(count as u64);
    }

    pub fn record_session_revoked(&self) {
        self.sessions_revoked.inc();
    }

    pub fn record_ingest_failure(&self) {
        self.ingest_failures.inc();
    }

    pub fn set_log_entries(&self, entries: usize) {
        self.log_entries.set(entries as i64);
    }

    pub fn watcher_started(&self) {
        self.active_watchers.inc();
    }

    pub fn watcher_stopped(&self) {
        self.active_watchers.dec();
    }

    pub fn active_watchers(&self) -> i64 {
        self.active_watchers.get()
    }

    pub fn sessions_revoked(&self) -> u64 {
        self.sessions_revoked.get()
    }

    pub fn ingest_failures(&self) -> u64 {
        self.ingest_failures.get()
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> AppResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metric_error)?;
        String::from_utf8(buffer).map_err(|e| AppError::Internal(format!("metrics encoding: {}", e)))
    }
}

fn metric_error(err: prometheus::Error) -> AppError {
    AppError::Internal(format!("metrics: {}", err))
}
