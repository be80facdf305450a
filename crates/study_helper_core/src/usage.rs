//! crates/study_helper_core/src/usage.rs
//!
//! The daily usage window state machine.
//!
//! A window is either within its 24 hour span or expired; an expired window
//! is rolled forward lazily on the next access, never by a background timer.
//! Every operation that depends on time takes `now` as an argument so the
//! whole module is a pure function of `(now, window_start, request_count)`
//! and can be tested with a fixed clock.

use crate::domain::{UsageWindow, DEFAULT_DAILY_LIMIT};
use chrono::{DateTime, Duration, Utc};

/// Length of the usage window. Sliding and lazy: the window only advances
/// when the account is next touched, so an account untouched for days still
/// resets exactly once on its next access.
pub const WINDOW: Duration = Duration::hours(24);

impl UsageWindow {
    /// A fresh window starting at `now` with the default daily limit.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self::with_limit(now, DEFAULT_DAILY_LIMIT)
    }

    pub fn with_limit(now: DateTime<Utc>, daily_limit: u32) -> Self {
        Self {
            request_count: 0,
            window_start: now,
            daily_limit,
        }
    }

    /// Rolls the window forward if it has expired. Returns `true` when the
    /// counter was reset, in which case the caller must persist the account.
    pub fn roll(&mut self, now: DateTime<Utc>) -> bool {
        if now - self.window_start >= WINDOW {
            self.request_count = 0;
            self.window_start = now;
            true
        } else {
            false
        }
    }

    /// Rolls the window, then decides admission: `true` while the count is
    /// below the daily limit.
    pub fn check_admission(&mut self, now: DateTime<Utc>) -> bool {
        self.roll(now);
        self.request_count < self.daily_limit
    }

    /// Counts one consumed request. Only call this after the quota-consuming
    /// action actually succeeded; failed attempts are free.
    pub fn record_request(&mut self) {
        self.request_count += 1;
    }

    /// Requests left in the current window, clamped at zero.
    pub fn remaining(&self) -> u32 {
        self.daily_limit.saturating_sub(self.request_count)
    }

    /// Time until the current window expires, clamped at zero.
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Duration {
        (WINDOW - (now - self.window_start)).max(Duration::zero())
    }

    /// Forced reset, independent of elapsed time.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.request_count = 0;
        self.window_start = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn remaining_tracks_count() {
        let now = fixed_now();
        let mut window = UsageWindow::new(now);

        assert_eq!(window.remaining(), DEFAULT_DAILY_LIMIT);
        window.record_request();
        window.record_request();
        assert_eq!(window.remaining(), DEFAULT_DAILY_LIMIT - 2);
        assert_eq!(window.remaining(), window.daily_limit - window.request_count);
    }

    #[test]
    fn admission_denied_exactly_at_limit() {
        let now = fixed_now();
        let mut window = UsageWindow::with_limit(now, 3);

        for _ in 0..3 {
            assert!(window.check_admission(now));
            window.record_request();
        }
        assert!(!window.check_admission(now));
        assert_eq!(window.remaining(), 0);
    }

    #[test]
    fn last_slot_scenario() {
        // dailyLimit=100, requestCount=99: one request left.
        let now = fixed_now();
        let mut window = UsageWindow::new(now);
        window.request_count = 99;

        assert!(window.check_admission(now));
        window.record_request();
        assert_eq!(window.request_count, 100);
        assert!(!window.check_admission(now));
        assert_eq!(window.remaining(), 0);
    }

    #[test]
    fn expired_window_resets_on_next_access() {
        // windowStart 25 hours in the past with an exhausted counter.
        let now = fixed_now();
        let mut window = UsageWindow::new(now - Duration::hours(25));
        window.request_count = 100;

        assert!(window.check_admission(now));
        assert_eq!(window.request_count, 0);
        assert_eq!(window.window_start, now);
    }

    #[test]
    fn window_rolls_at_exactly_24_hours() {
        let now = fixed_now();
        let mut window = UsageWindow::new(now - WINDOW);
        window.request_count = 5;

        assert!(window.roll(now));
        assert_eq!(window.request_count, 0);

        // Just inside the window: no roll.
        let mut window = UsageWindow::new(now - WINDOW + Duration::seconds(1));
        window.request_count = 5;
        assert!(!window.roll(now));
        assert_eq!(window.request_count, 5);
    }

    #[test]
    fn reset_is_idempotent_at_a_fixed_instant() {
        let now = fixed_now();
        let mut window = UsageWindow::new(now - Duration::hours(30));
        window.request_count = 42;

        assert!(window.check_admission(now));
        let after_first = window.clone();

        // Repeated accesses at the same instant change nothing further.
        assert!(window.check_admission(now));
        assert_eq!(window.remaining(), after_first.remaining());
        assert_eq!(window, after_first);
    }

    #[test]
    fn multiple_missed_windows_collapse_into_one_reset() {
        // Untouched for a week: a single roll lands the window at `now`,
        // not at some multiple of 24h past the old start.
        let now = fixed_now();
        let mut window = UsageWindow::new(now - Duration::days(7));
        window.request_count = 80;

        assert!(window.roll(now));
        assert_eq!(window.window_start, now);
        assert!(!window.roll(now));
    }

    #[test]
    fn time_until_reset_counts_down_and_clamps() {
        let now = fixed_now();
        let window = UsageWindow::new(now - Duration::hours(10));
        assert_eq!(window.time_until_reset(now), Duration::hours(14));

        let stale = UsageWindow::new(now - Duration::hours(30));
        assert_eq!(stale.time_until_reset(now), Duration::zero());
    }

    #[test]
    fn forced_reset_ignores_elapsed_time() {
        let now = fixed_now();
        let mut window = UsageWindow::new(now - Duration::hours(1));
        window.request_count = 17;

        window.reset(now);
        assert_eq!(window.request_count, 0);
        assert_eq!(window.window_start, now);
        assert_eq!(window.remaining(), window.daily_limit);
    }
}
