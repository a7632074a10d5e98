//! In-process logout event source
//!
//! Whatever receives logout notifications (a message bus consumer, an admin
//! endpoint) pushes session ids through a [`LogoutNotifier`]; the ingestor
//! pulls them out of the paired [`ChannelLogoutSource`].

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::domain::ports::LogoutEventSource;
use crate::shared::error::{AppError, AppResult};

/// Default number of undelivered batches buffered before senders wait
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Sending half: announces logged out sessions
#[derive(Clone, Debug)]
pub struct LogoutNotifier {
    sender: mpsc::Sender<Vec<String>>,
}

impl LogoutNotifier {
    /// Announce that the given sessions were logged out
    pub async fn notify(&self, session_ids: Vec<String>) -> AppResult<()> {
        if session_ids.is_empty() {
            return Ok(());
        }
        self.sender
            .send(session_ids)
            .await
            .map_err(|_| AppError::Internal("logout event source is gone".to_string()))
    }
}

/// Receiving half, consumed by the logout ingestor
pub struct ChannelLogoutSource {
    receiver: Mutex<mpsc::Receiver<Vec<String>>>,
}

impl ChannelLogoutSource {
    pub fn new() -> (Self, LogoutNotifier) {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, LogoutNotifier) {
        let (sender, receiver) = mpsc::channel(capacity);
        (
            Self {
                receiver: Mutex::new(receiver),
            },
            LogoutNotifier { sender },
        )
    }
}

#[async_trait]
impl LogoutEventSource for ChannelLogoutSource {
    async fn next_batch(&self, cancel: &CancellationToken) -> AppResult<Vec<String>> {
        let mut receiver = tokio::select! {
            _ = cancel.cancelled() => return Err(AppError::ContextCanceled),
            receiver = self.receiver.lock() => receiver,
        };

        let mut batch = tokio::select! {
            _ = cancel.cancelled() => return Err(AppError::ContextCanceled),
            batch = receiver.recv() => batch.ok_or_else(|| {
                AppError::IngestFailure("logout channel closed".to_string())
            })?,
        };

        // Coalesce whatever else is already queued into one publish
        while let Ok(more) = receiver.try_recv() {
            batch.extend(more);
        }

        Ok(batch)
    }
}
