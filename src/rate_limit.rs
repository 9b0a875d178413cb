//! Per-caller rate limiting for the coaching endpoint.
//!
//! Each caller key (user id, or a shared anonymous key) gets an
//! independent sliding window. The limiter is consulted before any
//! request work happens, so over-limit callers cost nothing downstream.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::LimitsConfig;

/// Keys tracked before idle entries are swept out.
const EVICT_THRESHOLD: usize = 1024;

/// Rate limiting error.
#[derive(Debug, Clone, Error)]
pub enum RateLimitError {
    /// Rate limit exceeded; must wait before retrying.
    #[error("rate limit exceeded; retry after {retry_after_secs}s")]
    Exceeded {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },
}

/// Sliding-window rate limiter for a single caller.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Maximum requests allowed per window.
    max_requests: u32,
    /// Window length.
    window: Duration,
    /// Timestamps of requests inside the current window.
    hits: VecDeque<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter allowing `max_requests` per `window`.
    #[must_use]
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: VecDeque::new(),
        }
    }

    /// Try to admit a request, returning an error if the limit is exceeded.
    ///
    /// On success, records the request timestamp and returns `Ok(())`.
    /// On failure, returns `RateLimitError::Exceeded` with the retry delay.
    pub fn try_acquire(&mut self) -> Result<(), RateLimitError> {
        let now = Instant::now();

        // Drop timestamps that have aged out of the window.
        while let Some(&first) = self.hits.front() {
            if now.duration_since(first) >= self.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }

        if self.hits.len() >= self.max_requests as usize {
            let retry_after_secs = match self.hits.front() {
                Some(&oldest) => {
                    let age = now.duration_since(oldest);
                    self.window.saturating_sub(age).as_secs().saturating_add(1)
                }
                // Zero-capacity limiter: nothing ever ages out.
                None => self.window.as_secs().max(1),
            };
            return Err(RateLimitError::Exceeded { retry_after_secs });
        }

        self.hits.push_back(now);
        Ok(())
    }

    /// Requests remaining in the current window.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.max_requests.saturating_sub(self.hits.len() as u32)
    }

    /// True when every recorded hit has aged out of the window.
    fn is_idle(&self, now: Instant) -> bool {
        match self.hits.back() {
            Some(&last) => now.duration_since(last) >= self.window,
            None => true,
        }
    }
}

/// Rate limiter over dynamic caller keys.
///
/// Keys are created lazily on first sight and share one configured
/// budget. Idle keys are swept once the map grows past a threshold, so
/// one-off callers do not accumulate forever.
#[derive(Debug)]
pub struct KeyedRateLimiter {
    max_requests: u32,
    window: Duration,
    limiters: HashMap<String, RateLimiter>,
}

impl KeyedRateLimiter {
    /// Create a keyed limiter from configuration.
    #[must_use]
    pub fn new(config: &LimitsConfig) -> Self {
        Self::with_window(
            config.max_requests,
            Duration::from_secs(config.window_secs),
        )
    }

    /// Create a keyed limiter with an explicit window.
    #[must_use]
    pub fn with_window(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            limiters: HashMap::new(),
        }
    }

    /// Try to admit a request for `key`.
    pub fn try_acquire(&mut self, key: &str) -> Result<(), RateLimitError> {
        self.evict_idle();
        let max_requests = self.max_requests;
        let window = self.window;
        self.limiters
            .entry(key.to_owned())
            .or_insert_with(|| RateLimiter::new(max_requests, window))
            .try_acquire()
    }

    /// Requests remaining for `key`. Unseen keys have the full budget.
    #[must_use]
    pub fn remaining(&self, key: &str) -> u32 {
        self.limiters
            .get(key)
            .map_or(self.max_requests, RateLimiter::remaining)
    }

    /// Number of caller keys currently tracked.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.limiters.len()
    }

    /// Drop idle keys once the map is oversized.
    fn evict_idle(&mut self) {
        if self.limiters.len() < EVICT_THRESHOLD {
            return;
        }
        let now = Instant::now();
        self.limiters.retain(|_, l| !l.is_idle(now));
    }
}
