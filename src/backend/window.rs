use crate::backend::{Decision, RateLimitSpec};
use actix_web::rt::time::Instant;
use std::collections::VecDeque;
use std::time::Duration;

/// Timestamps of the requests admitted for a single client, oldest first.
#[derive(Debug, Default, Clone)]
pub struct ClientWindow {
    timestamps: VecDeque<Instant>,
}

impl ClientWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prune the timestamps that have left the window, then admit and record `now` if fewer
    /// than `max_requests` remain.
    ///
    /// A denied request is not recorded.
    pub fn admit(&mut self, now: Instant, spec: &RateLimitSpec) -> Decision {
        self.prune(now, spec.window());
        let allowed = (self.timestamps.len() as u64) < spec.max_requests();
        if allowed {
            self.timestamps.push_back(now);
        }
        Decision::from_allowed(allowed)
    }

    /// Number of requests that would still be admitted at `now`.
    pub fn remaining(&self, now: Instant, spec: &RateLimitSpec) -> u64 {
        let counted = self
            .timestamps
            .iter()
            .filter(|ts| in_window(now, **ts, spec.window()))
            .count() as u64;
        spec.max_requests().saturating_sub(counted)
    }

    /// True when every recorded request has left the window, i.e. the window is equivalent to
    /// a fresh one.
    pub fn is_stale(&self, now: Instant, window: Duration) -> bool {
        self.timestamps
            .back()
            .map_or(true, |newest| !in_window(now, *newest, window))
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.timestamps.front() {
            if in_window(now, *oldest, window) {
                break;
            }
            self.timestamps.pop_front();
        }
    }
}

// Equivalent to `ts >= now - window`, without underflowing near the clock origin.
fn in_window(now: Instant, ts: Instant, window: Duration) -> bool {
    now.saturating_duration_since(ts) <= window
}
