//! Winner lifecycle and the single-active-winner invariant.
//!
//! Every transition runs under the winner-slot lock for its whole
//! read-modify-write, and multi-entry changes go to the store through one
//! `update_many` call. Promote, demote and expiry therefore never interleave,
//! and no reader can observe two active winners.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{ContestError, Result};
use crate::storage::EntryStore;
use crate::types::ContestEntry;

/// Default time a winner stays active.
pub fn default_retention() -> Duration {
    Duration::days(7)
}

/// Applies promote / demote / expire transitions through an [`EntryStore`].
pub struct WinnerLifecycle {
    store: Arc<dyn EntryStore>,
    retention: Duration,
    /// Serialises every transition touching the winner slot.
    slot: Mutex<()>,
}

impl WinnerLifecycle {
    pub fn new(store: Arc<dyn EntryStore>, retention: Duration) -> Self {
        Self {
            store,
            retention,
            slot: Mutex::new(()),
        }
    }

    /// Make `id` the only active winner, as of `now`.
    ///
    /// The target is resolved before anything is written: a missing id
    /// returns `NotFound` and leaves the current winner in place.
    pub async fn promote(&self, id: i64, now: DateTime<Utc>) -> Result<ContestEntry> {
        let _slot = self.slot.lock().await;

        let mut target = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ContestError::NotFound(id))?;

        let mut changes = Vec::new();
        for mut prior in self.store.list_winners().await? {
            if prior.id == id {
                continue;
            }
            info!(id = prior.id, name = %prior.account_name, "Demoting previous winner");
            prior.demote();
            changes.push(prior);
        }

        target.promote(now);
        changes.push(target.clone());
        self.store.update_many(&changes).await?;

        info!(
            id = target.id,
            name = %target.account_name,
            account = %target.account_number,
            won_at = %now,
            "Winner designated"
        );
        Ok(target)
    }

    /// Return `id` to open status if it is the active winner.
    ///
    /// Returns whether anything changed. A missing or already-open entry is
    /// a no-op.
    pub async fn demote(&self, id: i64) -> Result<bool> {
        let _slot = self.slot.lock().await;

        let Some(mut entry) = self.store.find_by_id(id).await? else {
            debug!(id, "Demote requested for unknown entry");
            return Ok(false);
        };
        if !entry.is_winner {
            return Ok(false);
        }

        entry.demote();
        self.store.update(&entry).await?;
        info!(id, name = %entry.account_name, "Winner removed");
        Ok(true)
    }

    /// Demote every active winner designated strictly before `now - retention`.
    ///
    /// Idempotent: a second call with the same `now` finds nothing to do.
    pub async fn expire_older_than(
        &self,
        retention: Duration,
        now: DateTime<Utc>,
    ) -> Result<Vec<ContestEntry>> {
        let _slot = self.slot.lock().await;
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            warn!(
                retention_days = retention.num_days(),
                "Retention window reaches past the calendar range, nothing to expire"
            );
            return Ok(Vec::new());
        };

        let mut expired: Vec<ContestEntry> = self
            .store
            .list_winners()
            .await?
            .into_iter()
            .filter(|w| w.won_before(cutoff))
            .collect();

        if expired.is_empty() {
            return Ok(expired);
        }

        for winner in &mut expired {
            winner.demote();
        }
        self.store.update_many(&expired).await?;

        for winner in &expired {
            info!(id = winner.id, name = %winner.account_name, "Auto-expired winner");
        }
        Ok(expired)
    }

    /// [`expire_older_than`](Self::expire_older_than) with the configured retention.
    pub async fn expire(&self, now: DateTime<Utc>) -> Result<Vec<ContestEntry>> {
        self.expire_older_than(self.retention, now).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
