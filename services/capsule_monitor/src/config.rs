//! Service configuration

use anyhow::{Context, Result};
use capsule_client::CapsuleFilter;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    /// Client settings (package, registry, RPC endpoint)
    pub client: capsule_client::Config,

    /// How often to re-read the registry (in seconds)
    pub poll_interval_secs: u64,

    /// Which capsules to list on each poll
    pub filter: CapsuleFilter,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let client = capsule_client::Config::from_lookup(&lookup)
            .context("Failed to load client configuration")?;

        let poll_interval_secs = lookup("POLL_INTERVAL")
            .unwrap_or_else(|| "15".to_string())
            .trim()
            .parse()
            .context("Invalid POLL_INTERVAL")?;
        if poll_interval_secs == 0 {
            anyhow::bail!("POLL_INTERVAL must be at least one second");
        }

        let filter = lookup("CAPSULE_FILTER")
            .unwrap_or_else(|| "all".to_string())
            .parse()
            .context("Invalid CAPSULE_FILTER")?;

        Ok(Self {
            client,
            poll_interval_secs,
            filter,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
