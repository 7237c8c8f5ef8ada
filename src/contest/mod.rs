//! Contest core: selection, winner lifecycle and expiry scheduling.
//!
//! [`ContestService`] is the facade used by the API and the scheduler. Every
//! path that reads winner state runs a lazy expiry sweep first, so a stale
//! winner is never visible for longer than one request.

pub mod lifecycle;
pub mod scheduler;
pub mod selector;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::ContestConfig;
use crate::error::{ContestError, Result};
use crate::storage::EntryStore;
use crate::types::{ContestEntry, NewEntry};
use lifecycle::WinnerLifecycle;
use selector::ScoredEntry;

/// Outcome of evaluating an actual price against the open entries.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub actual_price: Decimal,
    /// Entries tied at the minimum distance.
    pub closest: Vec<ContestEntry>,
    /// All open entries, closest first.
    pub ranking: Vec<ScoredEntry>,
}

impl Prediction {
    fn empty(actual_price: Decimal) -> Self {
        Self {
            actual_price,
            closest: Vec::new(),
            ranking: Vec::new(),
        }
    }
}

pub struct ContestService {
    store: Arc<dyn EntryStore>,
    lifecycle: WinnerLifecycle,
    recent_winners_limit: usize,
    /// Serialises the duplicate check and insert of submissions.
    submissions: Mutex<()>,
}

impl ContestService {
    pub fn new(store: Arc<dyn EntryStore>, config: &ContestConfig) -> Self {
        Self {
            lifecycle: WinnerLifecycle::new(store.clone(), config.retention()),
            store,
            recent_winners_limit: config.recent_winners_limit,
            submissions: Mutex::new(()),
        }
    }

    // -- Core operations -------------------------------------------------

    /// Open entries closest to `actual_price`.
    ///
    /// A non-positive price yields an empty result without touching the store.
    pub async fn predict_winners(&self, actual_price: Decimal) -> Result<Vec<ContestEntry>> {
        Ok(self.evaluate(actual_price).await?.closest)
    }

    /// Closest entries plus the full ranking for `actual_price`.
    pub async fn evaluate(&self, actual_price: Decimal) -> Result<Prediction> {
        if actual_price <= Decimal::ZERO {
            debug!(%actual_price, "Non-positive price, nothing to evaluate");
            return Ok(Prediction::empty(actual_price));
        }

        self.expire_stale().await?;
        let open = self.store.list_open_entries().await?;
        let closest = selector::closest_entries(actual_price, &open);
        let ranking = selector::rank(actual_price, &open);

        info!(
            %actual_price,
            open = open.len(),
            closest = closest.len(),
            "Prediction evaluated"
        );
        Ok(Prediction {
            actual_price,
            closest,
            ranking,
        })
    }

    /// Designate `id` as the single active winner.
    pub async fn set_winner(&self, id: i64) -> Result<ContestEntry> {
        self.lifecycle.promote(id, Utc::now()).await
    }

    /// Remove `id` as winner. Returns whether it was the active winner.
    pub async fn remove_winner(&self, id: i64) -> Result<bool> {
        self.lifecycle.demote(id).await
    }

    /// Expire winners older than the retention window, as of `now`.
    pub async fn run_expiry_sweep(&self, now: chrono::DateTime<Utc>) -> Result<usize> {
        Ok(self.lifecycle.expire(now).await?.len())
    }

    // -- Submission and read paths ---------------------------------------

    /// Record a new bracket guess.
    ///
    /// An account may hold only one open entry; winners may enter again.
    pub async fn submit_entry(&self, entry: NewEntry) -> Result<ContestEntry> {
        let entry = entry.normalized().map_err(ContestError::InvalidEntry)?;

        let _guard = self.submissions.lock().await;
        if self.store.has_open_entry(&entry.account_number).await? {
            return Err(ContestError::DuplicateEntry(entry.account_number));
        }

        let created = self.store.create_entry(&entry, Utc::now()).await?;
        info!(
            id = created.id,
            account = %created.account_number,
            lower = %created.lower_rate,
            upper = %created.upper_rate,
            "Entry submitted"
        );
        Ok(created)
    }

    /// The active winner, if any.
    pub async fn current_winner(&self) -> Result<Option<ContestEntry>> {
        self.expire_stale().await?;
        Ok(self.store.list_winners().await?.into_iter().next())
    }

    /// Active winners, newest first, capped at `limit` (or the configured default).
    pub async fn recent_winners(&self, limit: Option<usize>) -> Result<Vec<ContestEntry>> {
        self.expire_stale().await?;
        let limit = limit.unwrap_or(self.recent_winners_limit);
        let mut winners = self.store.list_winners().await?;
        winners.truncate(limit);
        Ok(winners)
    }

    /// Entries eligible for selection, by id.
    pub async fn open_entries(&self) -> Result<Vec<ContestEntry>> {
        self.expire_stale().await?;
        Ok(self.store.list_open_entries().await?)
    }

    /// Every entry regardless of status, by id.
    pub async fn all_entries(&self) -> Result<Vec<ContestEntry>> {
        self.expire_stale().await?;
        Ok(self.store.list_entries().await?)
    }

    async fn expire_stale(&self) -> Result<usize> {
        self.run_expiry_sweep(Utc::now()).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
