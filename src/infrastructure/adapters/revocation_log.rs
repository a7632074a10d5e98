//! In-memory revocation log with cursor-based long-poll receive
//!
//! Entries live in a deque behind a `RwLock`; a `watch` channel carries the
//! last assigned sequence so receivers can sleep until a publish passes their
//! cursor instead of polling.

use std::collections::VecDeque;

use tokio::sync::{watch, RwLock};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::domain::revocation::{Cursor, RevocationEntry};
use crate::shared::error::{AppError, AppResult};

struct LogState {
    entries: VecDeque<RevocationEntry>,
    last_sequence: Cursor,
}

/// Append-only, prunable, multi-consumer log of revoked session ids
pub struct RevocationLog {
    state: RwLock<LogState>,
    latest: watch::Sender<Cursor>,
}

impl RevocationLog {
    /// Create a log holding the empty-string sentinel as sequence 1,
    /// so `receive(0, ..)` never waits on a fresh log.
    pub fn new() -> Self {
        let sentinel = RevocationEntry::new(1, String::new(), Instant::now());
        let (latest, _) = watch::channel(1);

        Self {
            state: RwLock::new(LogState {
                entries: VecDeque::from([sentinel]),
                last_sequence: 1,
            }),
            latest,
        }
    }

    /// Append one entry per id and wake every receiver whose cursor is now behind.
    ///
    /// Returns the sequence of the last entry in the log afterwards.
    pub async fn publish<I, S>(&self, ids: I) -> Cursor
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let now = Instant::now();
        let mut state = self.state.write().await;
        let before = state.last_sequence;

        for id in ids {
            state.last_sequence += 1;
            let entry = RevocationEntry::new(state.last_sequence, id.into(), now);
            state.entries.push_back(entry);
        }

        let last = state.last_sequence;
        if last != before {
            // Still under the write lock, so the watched value only ever grows
            self.latest.send_replace(last);
            trace!(from = before + 1, to = last, "Published revocations");
        }
        last
    }

    /// Wait until something was published after `cursor`, then return the
    /// surviving ids past it together with the new cursor.
    ///
    /// Entries already pruned are skipped silently; when nothing past the
    /// cursor survived the result is empty and the cursor still advances.
    /// Returns `AppError::ContextCanceled` if `cancel` fires first.
    pub async fn receive(
        &self,
        cursor: Cursor,
        cancel: &CancellationToken,
    ) -> AppResult<(Cursor, Vec<String>)> {
        let mut latest = self.latest.subscribe();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::ContextCanceled),
            changed = latest.wait_for(|last| *last > cursor) => {
                changed
                    .map(|_| ())
                    .map_err(|_| AppError::Internal("revocation log closed".to_string()))?;
            }
        }

        let state = self.state.read().await;
        let start = state.entries.partition_point(|entry| entry.sequence <= cursor);
        let ids = state
            .entries
            .range(start..)
            .map(|entry| entry.session_id.clone())
            .collect();

        Ok((state.last_sequence, ids))
    }

    /// Remove every entry published before `before`. Returns how many were removed.
    ///
    /// Outstanding cursors stay valid and blocked receivers keep waiting.
    pub async fn prune(&self, before: Instant) -> usize {
        let mut state = self.state.write().await;
        let mut removed = 0;

        while state
            .entries
            .front()
            .is_some_and(|entry| entry.is_older_than(before))
        {
            state.entries.pop_front();
            removed += 1;
        }

        if removed > 0 {
            debug!(removed, remaining = state.entries.len(), "Pruned revocation log");
        }
        removed
    }

    /// Sequence of the most recently published entry
    pub async fn last_sequence(&self) -> Cursor {
        self.state.read().await.last_sequence
    }

    /// Number of retained entries (including the sentinel until it is pruned)
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// True once pruning has removed every entry, sentinel included
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

impl Default for RevocationLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RevocationLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationLog")
            .field("last_sequence", &*self.latest.borrow())
            .finish()
    }
}
