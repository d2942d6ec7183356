use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use stockwatch_inventory::{CacheConfig, ClientConfig, Region};

use crate::db::DbConfig;
use crate::notify::TelegramConfig;
use crate::scheduler::SchedulerConfig;

const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub database: DbConfig,
    pub scheduler: SchedulerConfig,
    pub cache: CacheConfig,
    pub client: ClientConfig,
    pub regions: Vec<Region>,
    pub telegram: TelegramConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr = lookup("STOCKWATCH_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse()
            .context("invalid STOCKWATCH_LISTEN_ADDR")?;

        let log_level = lookup("STOCKWATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let database = DbConfig::from_lookup(&lookup);

        let scheduler = SchedulerConfig {
            check_interval: secs(&lookup, "STOCKWATCH_CHECK_INTERVAL_SECS", 60)?,
            reclaim_interval: secs(&lookup, "STOCKWATCH_RECLAIM_INTERVAL_SECS", 3600)?,
            page_size: positive(&lookup, "STOCKWATCH_PAGE_SIZE", 100)? as i64,
        };

        let cache = CacheConfig {
            ttl: secs(&lookup, "STOCKWATCH_CACHE_TTL_SECS", 300)?,
            sweep_interval: secs(&lookup, "STOCKWATCH_CACHE_SWEEP_SECS", 600)?,
        };

        let client = ClientConfig {
            timeout: secs(&lookup, "STOCKWATCH_HTTP_TIMEOUT_SECS", 30)?,
        };

        let regions = Region::defaults()
            .into_iter()
            .map(|region| {
                let key = format!("STOCKWATCH_ENDPOINT_{}", region.env_key());
                match lookup(key.as_str()) {
                    Some(url) => region.with_base_url(url),
                    None => region,
                }
            })
            .collect();

        let Some(token) = lookup("TELEGRAM_TOKEN").filter(|t| !t.trim().is_empty()) else {
            bail!("TELEGRAM_TOKEN must be set");
        };

        let telegram = TelegramConfig {
            api_url: lookup("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            token,
            timeout: client.timeout,
        };

        Ok(Self {
            listen_addr,
            log_level,
            database,
            scheduler,
            cache,
            client,
            regions,
            telegram,
        })
    }
}

/// A strictly positive integer variable.
fn positive(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    let value = match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {key}: {raw}"))?,
        None => default,
    };

    if value == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(value)
}

fn secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<Duration> {
    positive(lookup, key, default).map(Duration::from_secs)
}
