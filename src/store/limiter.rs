//! Per-IP sliding-window rate limiting.
//!
//! Each client IP owns the sequence of its request instants within the
//! trailing window. Every call is recorded, including rejected ones, so a
//! sustained abuser keeps being rejected instead of having its window
//! quietly reset.
//!
//! This is deliberately a sliding-window counter, not a token bucket: the
//! admission rule is "at most N requests in the trailing W", nothing more.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::RateLimitConfig;

/// Table size above which `admit` prunes dead entries inline.
const PRUNE_TABLE_THRESHOLD: usize = 1024;

/// Sliding-window admission control keyed by client IP.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

impl RateLimiter {
    /// Creates a limiter with the given thresholds.
    pub fn new(config: RateLimitConfig) -> Self {
        RateLimiter {
            max_requests: config.max_requests,
            window: config.window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Records the request and returns whether it is admitted.
    ///
    /// The first N requests within the window return `true`; every further
    /// request returns `false` while still being recorded.
    pub fn admit(&self, ip: IpAddr) -> bool {
        self.admit_at(ip, Instant::now())
    }

    fn admit_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        // Opportunistic pruning when the table grows past the threshold,
        // so one-off IPs do not accumulate without bound.
        if windows.len() > PRUNE_TABLE_THRESHOLD {
            let cutoff = now.checked_sub(self.window);
            windows.retain(|_, stamps| {
                stamps.retain(|t| cutoff.is_none_or(|c| *t > c));
                !stamps.is_empty()
            });
        }

        let stamps = windows.entry(ip).or_default();
        let cutoff = now.checked_sub(self.window);
        stamps.retain(|t| cutoff.is_none_or(|c| *t > c));
        stamps.push(now);

        let admitted = stamps.len() <= self.max_requests as usize;
        if !admitted {
            debug!(%ip, in_window = stamps.len(), "request over rate ceiling");
        }
        admitted
    }

    /// Drops fully-expired windows. Safe to call from a periodic task.
    pub fn prune(&self) -> usize {
        self.prune_at(Instant::now())
    }

    fn prune_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        let cutoff = now.checked_sub(self.window);
        windows.retain(|_, stamps| {
            stamps.retain(|t| cutoff.is_none_or(|c| *t > c));
            !stamps.is_empty()
        });
        before - windows.len()
    }

    /// Number of IPs currently tracked.
    pub fn tracked_ips(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
