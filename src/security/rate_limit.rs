//! Sliding-window rate limiting.
//!
//! Each key owns an ordered log of admission timestamps. A check prunes the
//! entries that fell out of the trailing window and admits the call if fewer
//! than `max_requests` remain, appending the new timestamp under the same lock.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::observability::metrics;

/// Per-key sliding-window admission control.
///
/// Key state is never evicted; callers bound key cardinality themselves.
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    max_requests: u32,
    window: Duration,
    logs: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per key within `window`.
    pub fn new(name: impl Into<String>, max_requests: u32, window: Duration) -> Self {
        Self {
            name: name.into(),
            max_requests,
            window,
            logs: Mutex::new(HashMap::new()),
        }
    }

    /// Limiter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Maximum admissions per window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Window length.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check and record one request for `key`.
    pub fn is_allowed(&self, key: &str) -> bool {
        let now = Instant::now();
        let allowed = {
            let mut logs = self.logs.lock().expect("rate limiter mutex poisoned");
            let log = logs.entry(key.to_string()).or_default();
            prune(log, now, self.window);

            if log.len() < self.max_requests as usize {
                log.push_back(now);
                true
            } else {
                false
            }
        };

        if !allowed {
            tracing::debug!(limiter = %self.name, key = %key, "Rate limit exceeded");
        }
        metrics::record_rate_limit(&self.name, allowed);
        allowed
    }

    /// Admissions left for `key` in the current window.
    pub fn remaining(&self, key: &str) -> u32 {
        let now = Instant::now();
        let mut logs = self.logs.lock().expect("rate limiter mutex poisoned");
        let used = match logs.get_mut(key) {
            Some(log) => {
                prune(log, now, self.window);
                log.len()
            }
            None => 0,
        };
        (self.max_requests as usize).saturating_sub(used) as u32
    }

    /// Forget every timestamp recorded for `key`.
    pub fn reset(&self, key: &str) {
        self.logs
            .lock()
            .expect("rate limiter mutex poisoned")
            .remove(key);
    }
}

/// Drop timestamps that are no longer strictly inside the trailing window.
fn prune(log: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(front) = log.front() {
        if now.duration_since(*front) >= window {
            log.pop_front();
        } else {
            break;
        }
    }
}
