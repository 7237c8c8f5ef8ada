//! SQLite entry store.
//!
//! Entries live in a single `contest_entries` table created on connect.
//! Decimals are stored as TEXT so no precision is lost; timestamps use
//! sqlx's chrono encoding.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

use super::EntryStore;
use crate::error::{StoreError, StoreResult};
use crate::types::{ContestEntry, NewEntry};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contest_entries (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    account_number TEXT     NOT NULL,
    account_name   TEXT     NOT NULL,
    lower_rate     TEXT     NOT NULL,
    upper_rate     TEXT     NOT NULL,
    is_winner      BOOLEAN  NOT NULL DEFAULT 0,
    won_at         DATETIME NULL,
    created_at     DATETIME NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_contest_entries_winner ON contest_entries (is_winner);
CREATE INDEX IF NOT EXISTS idx_contest_entries_account ON contest_entries (account_number);
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, account_number, account_name, lower_rate, upper_rate, is_winner, won_at, created_at \
     FROM contest_entries";

/// SQLite-backed [`EntryStore`].
#[derive(Debug, Clone)]
pub struct SqliteEntryStore {
    pool: SqlitePool,
}

impl SqliteEntryStore {
    /// Open (creating if missing) the database at `url` and ensure the schema.
    ///
    /// In-memory URLs are pinned to a single long-lived connection, since
    /// every SQLite memory connection is its own database.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        let store = Self { pool };
        store.ensure_schema().await?;

        info!(url, in_memory, "Entry store ready");
        Ok(store)
    }

    async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn fetch(&self, clause: &str) -> StoreResult<Vec<ContestEntry>> {
        let sql = format!("{SELECT_COLUMNS} {clause}");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(entry_from_row).collect()
    }
}

fn entry_from_row(row: &SqliteRow) -> StoreResult<ContestEntry> {
    let id: i64 = row.try_get("id")?;
    let parse_rate = |column: &str| -> StoreResult<Decimal> {
        let raw: String = row.try_get(column)?;
        Decimal::from_str(&raw).map_err(|e| StoreError::Corrupt {
            id,
            reason: format!("{column} '{raw}': {e}"),
        })
    };

    Ok(ContestEntry {
        id,
        account_number: row.try_get("account_number")?,
        account_name: row.try_get("account_name")?,
        lower_rate: parse_rate("lower_rate")?,
        upper_rate: parse_rate("upper_rate")?,
        is_winner: row.try_get("is_winner")?,
        won_at: row.try_get("won_at")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl EntryStore for SqliteEntryStore {
    async fn create_entry(
        &self,
        entry: &NewEntry,
        created_at: DateTime<Utc>,
    ) -> StoreResult<ContestEntry> {
        let result = sqlx::query(
            "INSERT INTO contest_entries \
             (account_number, account_name, lower_rate, upper_rate, is_winner, won_at, created_at) \
             VALUES (?, ?, ?, ?, 0, NULL, ?)",
        )
        .bind(&entry.account_number)
        .bind(&entry.account_name)
        .bind(entry.lower_rate.to_string())
        .bind(entry.upper_rate.to_string())
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(id, account = %entry.account_number, "Entry inserted");

        Ok(ContestEntry {
            id,
            account_number: entry.account_number.clone(),
            account_name: entry.account_name.clone(),
            lower_rate: entry.lower_rate,
            upper_rate: entry.upper_rate,
            is_winner: false,
            won_at: None,
            created_at,
        })
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<ContestEntry>> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn list_open_entries(&self) -> StoreResult<Vec<ContestEntry>> {
        self.fetch("WHERE is_winner = 0 ORDER BY id ASC").await
    }

    async fn list_winners(&self) -> StoreResult<Vec<ContestEntry>> {
        self.fetch("WHERE is_winner = 1 ORDER BY id DESC").await
    }

    async fn list_entries(&self) -> StoreResult<Vec<ContestEntry>> {
        self.fetch("ORDER BY id ASC").await
    }

    async fn has_open_entry(&self, account_number: &str) -> StoreResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contest_entries WHERE account_number = ? AND is_winner = 0",
        )
        .bind(account_number)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    async fn update(&self, entry: &ContestEntry) -> StoreResult<()> {
        let result = sqlx::query("UPDATE contest_entries SET is_winner = ?, won_at = ? WHERE id = ?")
            .bind(entry.is_winner)
            .bind(entry.won_at)
            .bind(entry.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Vanished(entry.id));
        }
        Ok(())
    }

    async fn update_many(&self, entries: &[ContestEntry]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for entry in entries {
            let result =
                sqlx::query("UPDATE contest_entries SET is_winner = ?, won_at = ? WHERE id = ?")
                    .bind(entry.is_winner)
                    .bind(entry.won_at)
                    .bind(entry.id)
                    .execute(&mut *tx)
                    .await?;

            // Dropping `tx` without commit rolls back the earlier updates.
            if result.rows_affected() == 0 {
                return Err(StoreError::Vanished(entry.id));
            }
        }

        tx.commit().await?;
        debug!(count = entries.len(), "Entries updated in one transaction");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
