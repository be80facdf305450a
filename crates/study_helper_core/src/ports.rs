//! crates/study_helper_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    Account, AccountCredentials, HistoryEntry, HistoryKind, HistoryStats, UsageWindow,
};

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Duplicate(String),
    #[error("Upstream service failed: {0}")]
    Upstream(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Owner-scoped filter for history listings.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub kind: Option<HistoryKind>,
    /// Case-insensitive substring match over input and result text.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// A page of history entries plus the total matching count.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub entries: Vec<HistoryEntry>,
    pub total: u64,
}

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Account management ---

    /// Inserts a new account with a pre-hashed password. The store enforces
    /// email uniqueness; a clash surfaces as [`PortError::Duplicate`].
    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        usage: &UsageWindow,
    ) -> PortResult<Account>;

    async fn get_account_by_email(&self, email: &str) -> PortResult<Option<AccountCredentials>>;

    async fn get_account_by_id(&self, id: Uuid) -> PortResult<Option<Account>>;

    async fn get_credentials_by_id(&self, id: Uuid) -> PortResult<Option<AccountCredentials>>;

    /// Replaces the stored hash. Re-verifying the current password first is
    /// the caller's responsibility.
    async fn update_password(&self, id: Uuid, password_hash: &str) -> PortResult<()>;

    /// Deletes the account and, with it, every history entry it owns.
    async fn delete_account(&self, id: Uuid) -> PortResult<()>;

    // --- Usage window persistence ---

    /// Persists the in-memory window state (count and start) after a lazy
    /// roll or a forced reset.
    async fn save_usage(&self, id: Uuid, usage: &UsageWindow) -> PortResult<()>;

    /// Store-side `request_count = request_count + 1`. Atomic per row, so
    /// concurrent increments never lose counts even though admission itself
    /// is still checked read-then-write.
    async fn increment_usage(&self, id: Uuid) -> PortResult<()>;

    // --- History management ---

    async fn create_history(
        &self,
        account_id: Uuid,
        kind: HistoryKind,
        input_text: &str,
        result: &str,
        source_url: &str,
    ) -> PortResult<HistoryEntry>;

    async fn list_history(
        &self,
        account_id: Uuid,
        filter: &HistoryFilter,
    ) -> PortResult<HistoryPage>;

    async fn get_history_by_id(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> PortResult<Option<HistoryEntry>>;

    /// Returns `true` if an owned entry was deleted, `false` if no such
    /// entry exists for this owner.
    async fn delete_history(&self, account_id: Uuid, id: Uuid) -> PortResult<bool>;

    /// Deletes every entry owned by the account, returning the count.
    async fn clear_history(&self, account_id: Uuid) -> PortResult<u64>;

    /// Deletes owned entries created before `cutoff`, returning the count.
    async fn delete_history_older_than(
        &self,
        account_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> PortResult<u64>;

    async fn history_stats(&self, account_id: Uuid, now: DateTime<Utc>)
        -> PortResult<HistoryStats>;
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends one system+user exchange to the completion model and returns the
    /// generated text. Failures never consume the caller's quota.
    async fn complete(&self, system_prompt: &str, user_text: &str) -> PortResult<String>;
}
