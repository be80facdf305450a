//! crates/study_helper_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default daily request allowance for a new account.
pub const DEFAULT_DAILY_LIMIT: u32 = 100;

/// Represents a registered account - used throughout the app.
///
/// Never carries the password hash; credentials live in [`AccountCredentials`]
/// and are only surfaced to the login/password flows.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub usage: UsageWindow,
    pub created_at: DateTime<Utc>,
}

/// Only used internally for login and password checks - contains sensitive data.
#[derive(Debug, Clone)]
pub struct AccountCredentials {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

/// Per-account fixed-window usage counter. See [`crate::usage`] for the
/// window state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageWindow {
    pub request_count: u32,
    pub window_start: DateTime<Utc>,
    pub daily_limit: u32,
}

/// The closed set of study actions a history entry can record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Explain,
    Summarize,
    Flashcards,
}

impl HistoryKind {
    pub const ALL: [HistoryKind; 3] = [
        HistoryKind::Explain,
        HistoryKind::Summarize,
        HistoryKind::Flashcards,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryKind::Explain => "explain",
            HistoryKind::Summarize => "summarize",
            HistoryKind::Flashcards => "flashcards",
        }
    }
}

impl fmt::Display for HistoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryKind {
    type Err = UnknownHistoryKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "explain" => Ok(HistoryKind::Explain),
            "summarize" => Ok(HistoryKind::Summarize),
            "flashcards" => Ok(HistoryKind::Flashcards),
            other => Err(UnknownHistoryKind(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized history kind.
#[derive(Debug, thiserror::Error)]
#[error("unknown history kind '{0}', expected explain, summarize, or flashcards")]
pub struct UnknownHistoryKind(pub String);

/// A single saved AI interaction, owned by exactly one account.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub kind: HistoryKind,
    pub input_text: String,
    pub result: String,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
}

/// Per-kind history counts for the stats endpoint.
#[derive(Debug, Clone, Default)]
pub struct HistoryStats {
    pub total: u64,
    pub explain: u64,
    pub summarize: u64,
    pub flashcards: u64,
    pub last_7_days: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_kind_round_trips_through_str() {
        for kind in HistoryKind::ALL {
            assert_eq!(kind.as_str().parse::<HistoryKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_history_kind_is_rejected() {
        assert!("translate".parse::<HistoryKind>().is_err());
        assert!("".parse::<HistoryKind>().is_err());
        // The set is case-sensitive, matching what the store accepts.
        assert!("Explain".parse::<HistoryKind>().is_err());
    }
}
