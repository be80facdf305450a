//! services/api/src/web/protocol.rs
//!
//! Shared JSON payload shapes used across the REST handlers.
//!
//! Success responses wrap their data in `{"success": true, ...}` and failures
//! in `{"success": false, "error": ...}`; the failure half lives in
//! [`crate::web::error`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use study_helper_core::domain::{Account, HistoryEntry, UsageWindow};
use utoipa::ToSchema;
use uuid::Uuid;

/// Upper bound on user-supplied input text, in characters.
pub const MAX_INPUT_CHARS: usize = 5000;

/// Plain acknowledgement body.
#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Point-in-time view of an account's usage window.
#[derive(Debug, Serialize, ToSchema)]
pub struct UsagePayload {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
}

impl UsagePayload {
    pub fn from_window(window: &UsageWindow) -> Self {
        Self {
            used: window.request_count,
            limit: window.daily_limit,
            remaining: window.remaining(),
        }
    }
}

/// Usage view extended with window timing, for the usage-stats endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct UsageStatsPayload {
    #[serde(flatten)]
    pub usage: UsagePayload,
    pub window_start: DateTime<Utc>,
    /// Whole hours until the window rolls, rounded up; 0 means the next
    /// quota-consuming request starts a fresh window.
    pub resets_in_hours: i64,
}

impl UsageStatsPayload {
    pub fn from_window(window: &UsageWindow, now: DateTime<Utc>) -> Self {
        Self {
            usage: UsagePayload::from_window(window),
            window_start: window.window_start,
            resets_in_hours: hours_until_reset(window, now),
        }
    }
}

/// Whole hours until the window resets, rounded up and clamped at zero.
pub fn hours_until_reset(window: &UsageWindow, now: DateTime<Utc>) -> i64 {
    let seconds = window.time_until_reset(now).num_seconds();
    (seconds + 3599) / 3600
}

/// The public view of an account. Never carries the password hash.
#[derive(Serialize, ToSchema)]
pub struct AccountPayload {
    pub id: Uuid,
    pub email: String,
    pub api_usage: UsagePayload,
    pub created_at: DateTime<Utc>,
}

impl AccountPayload {
    pub fn from_account(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            api_usage: UsagePayload::from_window(&account.usage),
            created_at: account.created_at,
        }
    }
}

/// The public view of a saved AI interaction.
#[derive(Serialize, ToSchema)]
pub struct HistoryPayload {
    pub id: Uuid,
    pub kind: String,
    pub input_text: String,
    pub result: String,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
}

impl HistoryPayload {
    pub fn from_entry(entry: &HistoryEntry) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind.as_str().to_string(),
            input_text: entry.input_text.clone(),
            result: entry.result.clone(),
            source_url: entry.source_url.clone(),
            created_at: entry.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn hours_until_reset_rounds_up() {
        let now: DateTime<Utc> = "2024-06-01T12:00:00Z".parse().unwrap();
        let window = UsageWindow::new(now - Duration::hours(10) - Duration::minutes(30));
        // 13.5 hours left rounds up to 14.
        assert_eq!(hours_until_reset(&window, now), 14);

        let expired = UsageWindow::new(now - Duration::hours(30));
        assert_eq!(hours_until_reset(&expired, now), 0);
    }

    #[test]
    fn usage_payload_mirrors_the_window() {
        let now: DateTime<Utc> = "2024-06-01T12:00:00Z".parse().unwrap();
        let mut window = UsageWindow::with_limit(now, 10);
        window.request_count = 4;

        let payload = UsagePayload::from_window(&window);
        assert_eq!(payload.used, 4);
        assert_eq!(payload.limit, 10);
        assert_eq!(payload.remaining, 6);
    }
}
