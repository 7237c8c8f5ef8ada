//! Configuration loading from TOML with environment overrides.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section is optional and falls back to the defaults below, so an
//! empty file (or none at all, via [`AppConfig::default`]) is a valid setup.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::time::Duration;

/// Env var overriding the database URL from the config file.
pub const DATABASE_URL_ENV: &str = "CONTEST_DATABASE_URL";

/// Longest accepted winner retention (100 years).
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub contest: ContestConfig,
    pub scheduler: SchedulerConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ContestConfig {
    /// Days a winner stays active before automatic expiry.
    pub retention_days: u32,
    /// Winners listed by the recent-winners read path.
    pub recent_winners_limit: usize,
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            retention_days: 7,
            recent_winners_limit: 5,
        }
    }
}

impl ContestConfig {
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.retention_days))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Warm-up delay before the first sweep.
    pub startup_delay_secs: u64,
    /// Interval between sweeps.
    pub interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            startup_delay_secs: 10,
            interval_secs: 3600,
        }
    }
}

impl SchedulerConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx SQLite URL, e.g. `sqlite://contest.db` or `sqlite::memory:`.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://contest.db".to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides (currently the database URL).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            self.database.url = url;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.contest.retention_days == 0 {
            bail!("contest.retention_days must be at least 1");
        }
        if self.contest.retention_days > MAX_RETENTION_DAYS {
            bail!("contest.retention_days must be at most {MAX_RETENTION_DAYS}");
        }
        if self.scheduler.interval_secs == 0 {
            bail!("scheduler.interval_secs must be at least 1");
        }
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be at least 1");
        }
        Ok(())
    }
}
