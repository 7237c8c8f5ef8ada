//! Mock store for integration testing.
//!
//! Wraps [`MemoryEntryStore`] and yields to the scheduler before every
//! call, so concurrent tasks interleave between store operations the way
//! they would against a real database. Call counts are tracked for
//! assertions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bracket_contest::error::StoreResult;
use bracket_contest::storage::{EntryStore, MemoryEntryStore};
use bracket_contest::types::{ContestEntry, NewEntry};

pub struct SlowStore {
    inner: MemoryEntryStore,
    delay: Duration,
    writes: AtomicUsize,
}

impl SlowStore {
    pub fn new(entries: Vec<ContestEntry>, delay: Duration) -> Self {
        Self {
            inner: MemoryEntryStore::with_entries(entries),
            delay,
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of `update` / `update_many` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Winner count read straight from the backing map, with no delay.
    pub async fn winner_count(&self) -> usize {
        self.inner.list_winners().await.map(|w| w.len()).unwrap_or(0)
    }

    async fn pause(&self) {
        tokio::task::yield_now().await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl EntryStore for SlowStore {
    async fn create_entry(
        &self,
        entry: &NewEntry,
        created_at: DateTime<Utc>,
    ) -> StoreResult<ContestEntry> {
        self.pause().await;
        self.inner.create_entry(entry, created_at).await
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<ContestEntry>> {
        self.pause().await;
        self.inner.find_by_id(id).await
    }

    async fn list_open_entries(&self) -> StoreResult<Vec<ContestEntry>> {
        self.pause().await;
        self.inner.list_open_entries().await
    }

    async fn list_winners(&self) -> StoreResult<Vec<ContestEntry>> {
        self.pause().await;
        self.inner.list_winners().await
    }

    async fn list_entries(&self) -> StoreResult<Vec<ContestEntry>> {
        self.pause().await;
        self.inner.list_entries().await
    }

    async fn has_open_entry(&self, account_number: &str) -> StoreResult<bool> {
        self.pause().await;
        self.inner.has_open_entry(account_number).await
    }

    async fn update(&self, entry: &ContestEntry) -> StoreResult<()> {
        self.pause().await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(entry).await
    }

    async fn update_many(&self, entries: &[ContestEntry]) -> StoreResult<()> {
        self.pause().await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_many(entries).await
    }
}

/// Open entries with ids `1..=n`, each bracket one unit wide.
pub fn open_entries(n: i64) -> Vec<ContestEntry> {
    let now = Utc::now();
    (1..=n)
        .map(|i| ContestEntry {
            id: i,
            account_number: format!("ACC-{i:04}"),
            account_name: format!("Participant {i}"),
            lower_rate: rust_decimal::Decimal::from(i * 10),
            upper_rate: rust_decimal::Decimal::from(i * 10 + 1),
            is_winner: false,
            won_at: None,
            created_at: now,
        })
        .collect()
}
