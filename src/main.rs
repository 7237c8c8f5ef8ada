//! Bracket contest server.
//!
//! Entry point. Loads configuration, initialises structured logging, opens
//! the entry store, then runs the expiry scheduler and the JSON API until
//! Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use bracket_contest::api;
use bracket_contest::config::AppConfig;
use bracket_contest::contest::scheduler::ExpiryScheduler;
use bracket_contest::contest::ContestService;
use bracket_contest::storage::{EntryStore, SqliteEntryStore};

/// Env var naming an alternative config file.
const CONFIG_PATH_ENV: &str = "CONTEST_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let cfg = load_config()?;
    info!(
        retention_days = cfg.contest.retention_days,
        scheduler_enabled = cfg.scheduler.enabled,
        interval_secs = cfg.scheduler.interval_secs,
        api_enabled = cfg.server.enabled,
        "Bracket contest starting up"
    );

    // -- Store and service -----------------------------------------------

    let store: Arc<dyn EntryStore> = Arc::new(
        SqliteEntryStore::connect(&cfg.database.url, cfg.database.max_connections)
            .await
            .with_context(|| format!("Failed to open database {}", cfg.database.url))?,
    );
    let service = Arc::new(ContestService::new(store, &cfg.contest));

    // -- Background tasks ------------------------------------------------

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scheduler = if cfg.scheduler.enabled {
        let scheduler = ExpiryScheduler::from_config(service.clone(), &cfg.scheduler);
        Some(scheduler.spawn(shutdown_rx.clone()))
    } else {
        warn!("Expiry scheduler disabled, winners expire only on read");
        None
    };

    let server = if cfg.server.enabled {
        Some(tokio::spawn(api::serve(
            service.clone(),
            cfg.server.port,
            shutdown_rx.clone(),
        )))
    } else {
        None
    };

    // -- Wait for shutdown -----------------------------------------------

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Running. Press Ctrl+C to stop.");
    match server {
        Some(mut server) => {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received.");
                    let _ = shutdown_tx.send(true);
                    log_server_exit((&mut server).await);
                }
                result = &mut server => {
                    log_server_exit(result);
                    let _ = shutdown_tx.send(true);
                }
            }
        }
        None => {
            shutdown.await.context("Failed to listen for Ctrl+C")?;
            info!("Shutdown signal received.");
            let _ = shutdown_tx.send(true);
        }
    }

    if let Some(handle) = scheduler {
        match handle.await {
            Ok(stats) => info!(
                sweeps = stats.sweeps,
                expired = stats.expired,
                failures = stats.failures,
                "Scheduler finished"
            ),
            Err(e) => error!(error = %e, "Scheduler task panicked"),
        }
    }

    info!("Bracket contest shut down cleanly.");
    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = if std::path::Path::new(&path).exists() {
        AppConfig::load(&path)?
    } else {
        warn!(path = %path, "Config file not found, using defaults");
        AppConfig::default()
    };
    Ok(cfg.with_env_overrides())
}

fn log_server_exit(result: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "API server failed"),
        Err(e) => error!(error = %e, "API server task panicked"),
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bracket_contest=info"));

    let json_logging = std::env::var("CONTEST_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
