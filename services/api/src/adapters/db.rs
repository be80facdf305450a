//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};
use study_helper_core::domain::{
    Account, AccountCredentials, HistoryEntry, HistoryKind, HistoryStats, UsageWindow,
};
use study_helper_core::ports::{
    DatabaseService, HistoryFilter, HistoryPage, PortError, PortResult,
};
use uuid::Uuid;

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Emails are stored lowercase so the unique index enforces case-insensitive
/// uniqueness.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AccountRecord {
    id: Uuid,
    email: String,
    request_count: i32,
    window_start: DateTime<Utc>,
    daily_limit: i32,
    created_at: DateTime<Utc>,
}

impl AccountRecord {
    fn to_domain(self) -> Account {
        Account {
            id: self.id,
            email: self.email,
            usage: UsageWindow {
                request_count: self.request_count.max(0) as u32,
                window_start: self.window_start,
                daily_limit: self.daily_limit.max(0) as u32,
            },
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: Uuid,
    email: String,
    password_hash: String,
}

impl CredentialsRecord {
    fn to_domain(self) -> AccountCredentials {
        AccountCredentials {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct HistoryRecord {
    id: Uuid,
    account_id: Uuid,
    kind: String,
    input_text: String,
    result: String,
    source_url: String,
    created_at: DateTime<Utc>,
}

impl HistoryRecord {
    fn to_domain(self) -> PortResult<HistoryEntry> {
        let kind = self
            .kind
            .parse::<HistoryKind>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(HistoryEntry {
            id: self.id,
            account_id: self.account_id,
            kind,
            input_text: self.input_text,
            result: self.result,
            source_url: self.source_url,
            created_at: self.created_at,
        })
    }
}

const ACCOUNT_COLUMNS: &str = "id, email, request_count, window_start, daily_limit, created_at";
const HISTORY_COLUMNS: &str = "id, account_id, kind, input_text, result, source_url, created_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        usage: &UsageWindow,
    ) -> PortResult<Account> {
        let email = normalize_email(email);
        let record = sqlx::query_as::<_, AccountRecord>(
            "INSERT INTO accounts (id, email, password_hash, request_count, window_start, daily_limit) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, email, request_count, window_start, daily_limit, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&email)
        .bind(password_hash)
        .bind(usage.request_count as i32)
        .bind(usage.window_start)
        .bind(usage.daily_limit as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Duplicate(format!("Account with email {} already exists", email))
            }
            _ => PortError::Unexpected(e.to_string()),
        })?;

        Ok(record.to_domain())
    }

    async fn get_account_by_email(&self, email: &str) -> PortResult<Option<AccountCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash FROM accounts WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(CredentialsRecord::to_domain))
    }

    async fn get_account_by_id(&self, id: Uuid) -> PortResult<Option<Account>> {
        let record = sqlx::query_as::<_, AccountRecord>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(AccountRecord::to_domain))
    }

    async fn get_credentials_by_id(&self, id: Uuid) -> PortResult<Option<AccountCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash FROM accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(record.map(CredentialsRecord::to_domain))
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE accounts SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Account {} not found", id)));
        }
        Ok(())
    }

    async fn delete_account(&self, id: Uuid) -> PortResult<()> {
        // History rows go with the account via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Account {} not found", id)));
        }
        Ok(())
    }

    async fn save_usage(&self, id: Uuid, usage: &UsageWindow) -> PortResult<()> {
        sqlx::query("UPDATE accounts SET request_count = $1, window_start = $2 WHERE id = $3")
            .bind(usage.request_count as i32)
            .bind(usage.window_start)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn increment_usage(&self, id: Uuid) -> PortResult<()> {
        // Row-atomic, so concurrent consumers never lose an increment.
        sqlx::query("UPDATE accounts SET request_count = request_count + 1 WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn create_history(
        &self,
        account_id: Uuid,
        kind: HistoryKind,
        input_text: &str,
        result: &str,
        source_url: &str,
    ) -> PortResult<HistoryEntry> {
        let record = sqlx::query_as::<_, HistoryRecord>(
            "INSERT INTO history (id, account_id, kind, input_text, result, source_url) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, account_id, kind, input_text, result, source_url, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .bind(kind.as_str())
        .bind(input_text)
        .bind(result)
        .bind(source_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.to_domain()
    }

    async fn list_history(
        &self,
        account_id: Uuid,
        filter: &HistoryFilter,
    ) -> PortResult<HistoryPage> {
        let kind = filter.kind.map(|k| k.as_str());
        let search = filter.search.as_deref();

        let records = sqlx::query_as::<_, HistoryRecord>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM history \
             WHERE account_id = $1 \
               AND ($2::text IS NULL OR kind = $2) \
               AND ($3::text IS NULL OR input_text ILIKE '%' || $3 || '%' OR result ILIKE '%' || $3 || '%') \
             ORDER BY created_at DESC \
             LIMIT $4 OFFSET $5"
        ))
        .bind(account_id)
        .bind(kind)
        .bind(search)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let (total,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM history \
             WHERE account_id = $1 \
               AND ($2::text IS NULL OR kind = $2) \
               AND ($3::text IS NULL OR input_text ILIKE '%' || $3 || '%' OR result ILIKE '%' || $3 || '%')",
        )
        .bind(account_id)
        .bind(kind)
        .bind(search)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let entries = records
            .into_iter()
            .map(HistoryRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;

        Ok(HistoryPage {
            entries,
            total: total.max(0) as u64,
        })
    }

    async fn get_history_by_id(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> PortResult<Option<HistoryEntry>> {
        // Scoping by owner here is what keeps guessed ids from leaking
        // other accounts' entries.
        let record = sqlx::query_as::<_, HistoryRecord>(&format!(
            "SELECT {HISTORY_COLUMNS} FROM history WHERE id = $1 AND account_id = $2"
        ))
        .bind(id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        record.map(HistoryRecord::to_domain).transpose()
    }

    async fn delete_history(&self, account_id: Uuid, id: Uuid) -> PortResult<bool> {
        let result = sqlx::query("DELETE FROM history WHERE id = $1 AND account_id = $2")
            .bind(id)
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_history(&self, account_id: Uuid) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM history WHERE account_id = $1")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn delete_history_older_than(
        &self,
        account_id: Uuid,
        cutoff: DateTime<Utc>,
    ) -> PortResult<u64> {
        let result = sqlx::query("DELETE FROM history WHERE account_id = $1 AND created_at < $2")
            .bind(account_id)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn history_stats(
        &self,
        account_id: Uuid,
        now: DateTime<Utc>,
    ) -> PortResult<HistoryStats> {
        let by_kind: Vec<(String, i64)> = sqlx::query_as(
            "SELECT kind, COUNT(*) FROM history WHERE account_id = $1 GROUP BY kind",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let (last_7_days,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM history WHERE account_id = $1 AND created_at >= $2",
        )
        .bind(account_id)
        .bind(now - Duration::days(7))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut stats = HistoryStats {
            last_7_days: last_7_days.max(0) as u64,
            ..HistoryStats::default()
        };
        for (kind, count) in by_kind {
            let count = count.max(0) as u64;
            stats.total += count;
            match kind.parse::<HistoryKind>() {
                Ok(HistoryKind::Explain) => stats.explain = count,
                Ok(HistoryKind::Summarize) => stats.summarize = count,
                Ok(HistoryKind::Flashcards) => stats.flashcards = count,
                Err(e) => return Err(PortError::Unexpected(e.to_string())),
            }
        }

        Ok(stats)
    }
}
