//! Sliding-window rate limiter shared by all notifications.

use std::collections::VecDeque;

/// Caps the number of admitted notifications per sliding window.
///
/// Timestamps are whole seconds since the Unix epoch. Entries are stored in
/// arrival order, so eviction always drains from the front.
#[derive(Debug)]
pub struct RateLimiter {
    window: VecDeque<i64>,
    window_secs: i64,
    max_events: usize,
}

impl RateLimiter {
    /// Create a limiter allowing `max_events` admissions per `window_secs`.
    pub fn new(window_secs: i64, max_events: usize) -> Self {
        Self {
            window: VecDeque::new(),
            window_secs,
            max_events,
        }
    }

    /// Admit one attempt at `now`, recording it only when admitted.
    pub fn admit_at(&mut self, now: i64) -> bool {
        // Drain entries older than the window (strictly greater age).
        while self
            .window
            .front()
            .is_some_and(|t| now.saturating_sub(*t) > self.window_secs)
        {
            self.window.pop_front();
        }

        if self.window.len() >= self.max_events {
            return false;
        }
        self.window.push_back(now);
        true
    }

    /// Number of retained timestamps.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether no timestamps are retained.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}
