//! Revocation log entries

use tokio::time::Instant;

/// Position in the revocation log's sequence space.
///
/// A consumer keeps the last cursor it saw and asks for everything after it.
/// Cursor 0 precedes every entry.
pub type Cursor = u64;

/// One revoked session id. Immutable once published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevocationEntry {
    pub sequence: Cursor,
    pub session_id: String,
    pub published_at: Instant,
}

impl RevocationEntry {
    pub fn new(sequence: Cursor, session_id: String, published_at: Instant) -> Self {
        Self {
            sequence,
            session_id,
            published_at,
        }
    }

    /// True when the entry was published strictly before `before`
    pub fn is_older_than(&self, before: Instant) -> bool {
        self.published_at < before
    }
}
