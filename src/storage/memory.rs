//! In-memory entry store.
//!
//! Holds entries in a `BTreeMap` behind a tokio `RwLock`. Writes in
//! `update_many` happen under one write guard, so they are observed
//! all-or-nothing. A failure switch lets callers simulate an unreachable
//! backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tokio::sync::RwLock;

use super::EntryStore;
use crate::error::{StoreError, StoreResult};
use crate::types::{ContestEntry, NewEntry};

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<i64, ContestEntry>,
    next_id: i64,
}

/// In-process [`EntryStore`].
#[derive(Debug, Default)]
pub struct MemoryEntryStore {
    inner: RwLock<Inner>,
    /// If set, every operation fails with this message.
    force_error: Mutex<Option<String>>,
}

impl MemoryEntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `entries`, keeping their ids.
    pub fn with_entries(entries: Vec<ContestEntry>) -> Self {
        let next_id = entries.iter().map(|e| e.id).max().unwrap_or(0);
        let entries = entries.into_iter().map(|e| (e.id, e)).collect();
        Self {
            inner: RwLock::new(Inner { entries, next_id }),
            force_error: Mutex::new(None),
        }
    }

    /// Force all subsequent operations to return `StoreError::Unavailable`.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap_or_else(|p| p.into_inner()) = Some(msg.to_string());
    }

    /// Clear any forced error.
    pub fn clear_error(&self) {
        *self.force_error.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    fn check(&self) -> StoreResult<()> {
        match self.force_error.lock().unwrap_or_else(|p| p.into_inner()).as_ref() {
            Some(msg) => Err(StoreError::Unavailable(msg.clone())),
            None => Ok(()),
        }
    }

    async fn collect<F>(&self, pred: F) -> StoreResult<Vec<ContestEntry>>
    where
        F: Fn(&ContestEntry) -> bool + Send,
    {
        self.check()?;
        let inner = self.inner.read().await;
        Ok(inner.entries.values().filter(|e| pred(e)).cloned().collect())
    }
}

fn apply(target: &mut ContestEntry, source: &ContestEntry) {
    target.is_winner = source.is_winner;
    target.won_at = source.won_at;
}

#[async_trait]
impl EntryStore for MemoryEntryStore {
    async fn create_entry(
        &self,
        entry: &NewEntry,
        created_at: DateTime<Utc>,
    ) -> StoreResult<ContestEntry> {
        self.check()?;
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let created = ContestEntry {
            id: inner.next_id,
            account_number: entry.account_number.clone(),
            account_name: entry.account_name.clone(),
            lower_rate: entry.lower_rate,
            upper_rate: entry.upper_rate,
            is_winner: false,
            won_at: None,
            created_at,
        };
        inner.entries.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<ContestEntry>> {
        self.check()?;
        Ok(self.inner.read().await.entries.get(&id).cloned())
    }

    async fn list_open_entries(&self) -> StoreResult<Vec<ContestEntry>> {
        self.collect(|e| !e.is_winner).await
    }

    async fn list_winners(&self) -> StoreResult<Vec<ContestEntry>> {
        let mut winners = self.collect(|e| e.is_winner).await?;
        winners.reverse();
        Ok(winners)
    }

    async fn list_entries(&self) -> StoreResult<Vec<ContestEntry>> {
        self.collect(|_| true).await
    }

    async fn has_open_entry(&self, account_number: &str) -> StoreResult<bool> {
        self.check()?;
        let inner = self.inner.read().await;
        Ok(inner
            .entries
            .values()
            .any(|e| e.account_number == account_number && !e.is_winner))
    }

    async fn update(&self, entry: &ContestEntry) -> StoreResult<()> {
        self.update_many(std::slice::from_ref(entry)).await
    }

    async fn update_many(&self, entries: &[ContestEntry]) -> StoreResult<()> {
        self.check()?;
        let mut inner = self.inner.write().await;

        if let Some(missing) = entries.iter().find(|e| !inner.entries.contains_key(&e.id)) {
            return Err(StoreError::Vanished(missing.id));
        }
        for entry in entries {
            if let Some(target) = inner.entries.get_mut(&entry.id) {
                apply(target, entry);
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
