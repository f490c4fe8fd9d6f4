//! Capsule monitor service binary

use anyhow::{Context, Result};
use capsule_monitor::{run, Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Capsule Monitor Configuration:");
    info!("  RPC URL: {}", config.client.rpc_url);
    info!("  Registry: {}", config.client.registry_id);
    info!("  Poll Interval: {}s", config.poll_interval_secs);

    run(config).await
}
