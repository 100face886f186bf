//! Sliding-window rate limiter, keyed by client identity.
//!
//! Counts individual request instants inside a trailing 60-second window
//! rather than refilling fixed buckets, so a burst that was allowed a
//! minute ago ages out smoothly instead of resetting on a boundary.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const WINDOW: Duration = Duration::from_secs(60);

/// Per-client sliding-window rate limiter.
///
/// State lives only for the process lifetime; clients appear in the map on
/// their first request and their window is pruned lazily on each check.
/// There is no global cap on tracked clients; the gateway fronts a single
/// vault and sees a small, stable client population.
pub struct RateLimiter {
    windows: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Try to admit one request for `client`.
    ///
    /// Returns `true` and records the request if fewer than `limit`
    /// requests remain in the client's trailing window; returns `false`
    /// without recording the attempt otherwise, so rejected traffic does
    /// not extend its own penalty.
    pub async fn allow(&self, client: &str, limit: u32) -> bool {
        self.allow_at(client, limit, Instant::now()).await
    }

    /// [`allow`](Self::allow) with an explicit clock, for tests.
    pub async fn allow_at(&self, client: &str, limit: u32, now: Instant) -> bool {
        let mut windows = self.windows.lock().await;
        let window = windows.entry(client.to_owned()).or_default();

        window.retain(|&t| now.duration_since(t) < WINDOW);

        if window.len() >= limit as usize {
            return false;
        }
        window.push(now);
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
