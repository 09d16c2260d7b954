//! TTL-based suppression of repeated events.

use std::collections::HashMap;
use std::hash::Hash;

use crate::event::DedupKey;

/// Suppresses a key for `ttl_secs` after it was last admitted.
///
/// Expired entries are swept lazily on every call. A suppressed duplicate
/// does not refresh the expiry. A TTL of zero or less admits everything.
#[derive(Debug)]
pub struct Deduplicator<K = DedupKey> {
    expiries: HashMap<K, i64>,
    ttl_secs: i64,
}

impl<K: Hash + Eq> Deduplicator<K> {
    /// Create a deduplicator with the given time-to-live in seconds.
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            expiries: HashMap::new(),
            ttl_secs,
        }
    }

    /// Admit `key` at `now` unless an unexpired entry exists.
    pub fn admit_at(&mut self, key: K, now: i64) -> bool {
        self.expiries.retain(|_, expiry| *expiry > now);

        if self.expiries.contains_key(&key) {
            return false;
        }
        self.expiries.insert(key, now.saturating_add(self.ttl_secs));
        true
    }

    /// Number of entries currently held (including not-yet-swept expired ones).
    pub fn len(&self) -> usize {
        self.expiries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.expiries.is_empty()
    }
}
