//! Noise control: deduplication followed by global rate limiting.
//!
//! The gate order is fixed. A duplicate is rejected before the rate limiter
//! is consulted, so duplicates never consume rate budget.

pub mod dedup;
pub mod throttle;

pub use dedup::Deduplicator;
pub use throttle::RateLimiter;

use crate::config::NoiseSettings;
use crate::event::DedupKey;

/// Result of running an event through both gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Passed both gates.
    Admitted,
    /// Rejected by the deduplicator.
    Duplicate,
    /// Rejected by the rate limiter.
    Throttled,
}

/// Owned pair of noise-control filters.
#[derive(Debug)]
pub struct NoiseControl {
    dedup: Deduplicator<DedupKey>,
    limiter: RateLimiter,
}

impl NoiseControl {
    /// Build both filters from the resolved settings.
    pub fn new(settings: &NoiseSettings) -> Self {
        Self {
            dedup: Deduplicator::new(settings.dedup_ttl_secs),
            limiter: RateLimiter::new(settings.throttle_window_secs, settings.throttle_max),
        }
    }

    /// Run `key` through the dedup gate, then the rate gate, at `now`.
    pub fn admit_at(&mut self, key: DedupKey, now: i64) -> Admission {
        if !self.dedup.admit_at(key, now) {
            return Admission::Duplicate;
        }
        if !self.limiter.admit_at(now) {
            return Admission::Throttled;
        }
        Admission::Admitted
    }

    /// Deduplicator state, for inspection.
    pub fn dedup(&self) -> &Deduplicator<DedupKey> {
        &self.dedup
    }

    /// Rate limiter state, for inspection.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

/// Current wall-clock time in whole seconds since the Unix epoch.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}
