//! Sliding-window rate limiter for per-domain fetch limits.
//!
//! Each domain keeps the timestamps of its accepted requests from the
//! trailing minute. Only accepted requests are recorded, so a client hammering
//! a limited domain does not extend its own lockout.

use std::collections::{HashMap, VecDeque};
use tokio::sync::RwLock;
use tokio::time::{Duration, Instant};

/// Length of the trailing window.
pub const RATE_WINDOW: Duration = Duration::from_secs(60);

/// Rejection details for a domain over its limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimited {
    pub domain: String,
    /// Requests already accepted inside the window.
    pub count: usize,
    pub retry_after_ms: u64,
}

/// Rate limit status for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub requests_per_minute: u32,
    pub requests_in_window: usize,
    pub next_available_in_ms: Option<u64>,
}

/// Request timestamps for one domain, oldest first.
#[derive(Debug, Default)]
struct RateWindow {
    requests: VecDeque<Instant>,
}

impl RateWindow {
    /// Drop entries that have fallen out of the window.
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.requests.front() {
            if now.duration_since(oldest) >= RATE_WINDOW {
                self.requests.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until the oldest entry leaves the window.
    fn wait_time(&self, now: Instant) -> Duration {
        self.requests
            .front()
            .map(|&oldest| RATE_WINDOW.saturating_sub(now.duration_since(oldest)))
            .unwrap_or_default()
    }
}

/// Per-domain limiter pool.
pub struct RateLimiter {
    limit: u32,
    windows: RwLock<HashMap<String, RateWindow>>,
}

impl RateLimiter {
    /// `requests_per_minute == 0` disables limiting.
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            limit: requests_per_minute,
            windows: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    /// Record a request for `domain`, or reject it without recording.
    pub async fn try_acquire(&self, domain: &str) -> Result<(), RateLimited> {
        if !self.is_enabled() {
            return Ok(());
        }

        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let window = windows.entry(domain.to_string()).or_default();
        window.prune(now);

        if window.requests.len() >= self.limit as usize {
            return Err(RateLimited {
                domain: domain.to_string(),
                count: window.requests.len(),
                retry_after_ms: window.wait_time(now).as_millis() as u64,
            });
        }

        window.requests.push_back(now);
        Ok(())
    }

    /// Get rate limit status for a specific domain.
    pub async fn get_status(&self, domain: &str) -> Option<RateLimitStatus> {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let window = windows.get_mut(domain)?;
        window.prune(now);

        let full = self.is_enabled() && window.requests.len() >= self.limit as usize;
        Some(RateLimitStatus {
            requests_per_minute: self.limit,
            requests_in_window: window.requests.len(),
            next_available_in_ms: full.then(|| window.wait_time(now).as_millis() as u64),
        })
    }

    /// Number of domains with a window (including drained ones).
    pub async fn tracked_domains(&self) -> usize {
        self.windows.read().await.len()
    }
}
