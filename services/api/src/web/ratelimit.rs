//! services/api/src/web/ratelimit.rs
//!
//! Per-IP request throttles for the public auth endpoints and the AI
//! endpoint. Fixed window, in-memory, process-local - this damps brute force
//! and burst abuse on a single instance; it is not the per-account daily
//! quota, and it is not distributed.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::web::error::WebError;

/// Fixed-window counter per client IP.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    /// Client-facing message when the limit trips.
    message: &'static str,
    counts: RwLock<HashMap<IpAddr, (u32, Instant)>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration, message: &'static str) -> Self {
        Self {
            max_requests,
            window,
            message,
            counts: RwLock::new(HashMap::new()),
        }
    }

    /// Counts one request from `ip`; `false` means over the limit.
    pub fn check(&self, ip: IpAddr) -> bool {
        let mut counts = self.counts.write().expect("rate limiter lock poisoned");
        let now = Instant::now();

        let entry = counts.entry(ip).or_insert((0, now));

        // Reset the counter once the window has passed.
        if now.duration_since(entry.1) >= self.window {
            *entry = (0, now);
        }

        if entry.0 >= self.max_requests {
            return false;
        }

        entry.0 += 1;
        true
    }

    /// Requests left in the current window for `ip`.
    pub fn remaining(&self, ip: IpAddr) -> u32 {
        let counts = self.counts.read().expect("rate limiter lock poisoned");
        let now = Instant::now();

        match counts.get(&ip) {
            Some((count, started)) => {
                if now.duration_since(*started) >= self.window {
                    self.max_requests
                } else {
                    self.max_requests.saturating_sub(*count)
                }
            }
            None => self.max_requests,
        }
    }
}

/// Middleware wrapping a shared [`RateLimiter`].
pub async fn throttle(
    State(limiter): State<Arc<RateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, WebError> {
    if !limiter.check(addr.ip()) {
        return Err(WebError::Throttled(limiter.message.to_string()));
    }
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([127, 0, 0, last])
    }

    #[test]
    fn denies_after_the_limit() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60), "slow down");

        for _ in 0..5 {
            assert!(limiter.check(ip(1)));
        }
        assert!(!limiter.check(ip(1)));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60), "slow down");

        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));
        // A different client is unaffected.
        assert!(limiter.check(ip(2)));
    }

    #[test]
    fn remaining_counts_down() {
        let limiter = RateLimiter::new(10, Duration::from_secs(60), "slow down");

        assert_eq!(limiter.remaining(ip(1)), 10);
        limiter.check(ip(1));
        assert_eq!(limiter.remaining(ip(1)), 9);

        for _ in 0..4 {
            limiter.check(ip(1));
        }
        assert_eq!(limiter.remaining(ip(1)), 5);
    }

    #[test]
    fn window_expiry_resets_the_count() {
        let limiter = RateLimiter::new(1, Duration::from_millis(10), "slow down");

        assert!(limiter.check(ip(1)));
        assert!(!limiter.check(ip(1)));

        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check(ip(1)));
    }
}
