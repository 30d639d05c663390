//! Per-key fixed-window rate limiting.
//!
//! Counters live in process memory: the protected operations are
//! read-only lookups, so losing counts on restart is acceptable. The
//! first call for a key starts its window; once the window elapses the
//! next call resets it entirely. Expired entries are swept inline when
//! the map grows past a threshold, keeping the structure bounded under
//! sustained unique-key traffic.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default maximum operations per window.
pub const DEFAULT_LIMIT: u32 = 10;

/// Default window length in seconds.
pub const DEFAULT_WINDOW_SECS: u64 = 60;

/// Map size beyond which a check also sweeps expired windows.
const SWEEP_THRESHOLD: usize = 1024;

/// Result of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitResult {
    /// Whether the rate limit has been exceeded.
    pub exceeded: bool,
    /// Seconds until the rate limit window resets (if exceeded).
    pub retry_after: u64,
}

/// One key's counter window.
#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

/// Process-wide fixed-window rate limiter.
///
/// The mutex is only held for the duration of a map update and is never
/// held across an await point.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `limit` operations per `window`.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Records one operation for `key` and reports whether it is allowed.
    pub fn check(&self, key: &str) -> RateLimitResult {
        self.check_at(key, Instant::now())
    }

    /// Clock-injected variant of [`check`](Self::check).
    fn check_at(&self, key: &str, now: Instant) -> RateLimitResult {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() > SWEEP_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started_at) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });

        // Fixed window: elapsed means a full reset, not a rolling decay.
        if now.duration_since(entry.started_at) >= self.window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= self.limit {
            let elapsed = now.duration_since(entry.started_at);
            let remaining = self.window.saturating_sub(elapsed);
            return RateLimitResult {
                exceeded: true,
                retry_after: remaining.as_secs().max(1),
            };
        }

        entry.count += 1;
        RateLimitResult {
            exceeded: false,
            retry_after: 0,
        }
    }

    /// Number of live keys; used by tests and diagnostics.
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, Duration::from_secs(DEFAULT_WINDOW_SECS))
    }
}
