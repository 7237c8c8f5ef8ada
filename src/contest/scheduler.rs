//! Background winner expiry.
//!
//! Sweeps once after a warm-up delay, then on a fixed interval until the
//! shutdown signal flips. Sweeps go through [`ContestService::run_expiry_sweep`],
//! the same path used by request-time lazy expiry.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use super::ContestService;
use crate::config::SchedulerConfig;

/// Counters reported when the scheduler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Sweeps that completed.
    pub sweeps: u64,
    /// Winners expired across all sweeps.
    pub expired: u64,
    /// Sweeps that failed with a store error.
    pub failures: u64,
}

pub struct ExpiryScheduler {
    service: Arc<ContestService>,
    startup_delay: Duration,
    interval: Duration,
}

impl ExpiryScheduler {
    pub fn new(service: Arc<ContestService>, startup_delay: Duration, interval: Duration) -> Self {
        Self {
            service,
            startup_delay,
            interval,
        }
    }

    pub fn from_config(service: Arc<ContestService>, config: &SchedulerConfig) -> Self {
        Self::new(service, config.startup_delay(), config.interval())
    }

    /// Run on a background task.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<SchedulerStats> {
        tokio::spawn(self.run(shutdown))
    }

    /// Sweep until `shutdown` becomes true (or its sender is dropped).
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> SchedulerStats {
        let mut stats = SchedulerStats::default();
        info!(
            startup_delay_secs = self.startup_delay.as_secs_f64(),
            interval_secs = self.interval.as_secs(),
            "Expiry scheduler started"
        );

        tokio::select! {
            _ = tokio::time::sleep(self.startup_delay) => {}
            _ = shutdown_requested(&mut shutdown) => {
                info!("Expiry scheduler stopped during warm-up");
                return stats;
            }
        }

        // The first tick completes immediately: that is the startup sweep.
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        biased;
                        _ = shutdown_requested(&mut shutdown) => break,
                        _ = self.sweep(&mut stats) => {}
                    }
                }
            }
        }

        info!(
            sweeps = stats.sweeps,
            expired = stats.expired,
            failures = stats.failures,
            "Expiry scheduler stopped"
        );
        stats
    }

    async fn sweep(&self, stats: &mut SchedulerStats) {
        match self.service.run_expiry_sweep(Utc::now()).await {
            Ok(expired) => {
                stats.sweeps += 1;
                stats.expired += expired as u64;
                if expired > 0 {
                    info!(expired, "Expiry sweep complete");
                } else {
                    debug!("Expiry sweep found nothing to expire");
                }
            }
            Err(e) => {
                stats.failures += 1;
                error!(error = %e, "Expiry sweep failed, continuing to next cycle");
            }
        }
    }
}

/// Resolves once the flag is true or the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
