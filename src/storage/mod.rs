//! Persistence layer.
//!
//! Defines the `EntryStore` trait consumed by the contest core and provides
//! two implementations:
//! - [`sqlite::SqliteEntryStore`]: durable storage on SQLite via sqlx
//! - [`memory::MemoryEntryStore`]: in-process map for tests and throwaway runs
//!
//! Stores do not enforce the single-winner invariant. That is the job of
//! [`WinnerLifecycle`](crate::contest::lifecycle::WinnerLifecycle).

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreResult;
use crate::types::{ContestEntry, NewEntry};

pub use memory::MemoryEntryStore;
pub use sqlite::SqliteEntryStore;

/// Abstraction over contest entry persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert a new open entry and return it with its assigned id.
    async fn create_entry(
        &self,
        entry: &NewEntry,
        created_at: DateTime<Utc>,
    ) -> StoreResult<ContestEntry>;

    /// Look up a single entry.
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<ContestEntry>>;

    /// All entries that are not currently winners, ordered by id.
    async fn list_open_entries(&self) -> StoreResult<Vec<ContestEntry>>;

    /// All entries currently flagged as winners, newest id first.
    async fn list_winners(&self) -> StoreResult<Vec<ContestEntry>>;

    /// Every entry, ordered by id.
    async fn list_entries(&self) -> StoreResult<Vec<ContestEntry>>;

    /// Whether `account_number` already has a non-winning entry.
    async fn has_open_entry(&self, account_number: &str) -> StoreResult<bool>;

    /// Persist the winner fields (`is_winner`, `won_at`) of one entry.
    async fn update(&self, entry: &ContestEntry) -> StoreResult<()>;

    /// Persist the winner fields of several entries as a single transaction.
    async fn update_many(&self, entries: &[ContestEntry]) -> StoreResult<()>;
}
