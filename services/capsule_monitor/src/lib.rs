//! Capsule Monitor Service
//!
//! Polls the capsule registry and logs the decoded list and status changes

pub mod config;
pub mod monitor;

pub use config::Config;
pub use monitor::{CapsuleMonitor, PollReport, StatusChange};

use anyhow::{Context, Result};
use capsule_client::CapsuleClient;
use tracing::{error, info, warn};

/// Main entry point for the monitor service
pub async fn run(config: Config) -> Result<()> {
    info!("Starting capsule monitor (filter: {})", config.filter);

    for field in config.client.placeholder_fields() {
        warn!("{} is not set; using placeholder object id", field);
    }

    let client =
        CapsuleClient::new(config.client.clone()).context("Failed to create capsule client")?;
    let mut monitor = CapsuleMonitor::new(&client, &config);

    loop {
        match monitor.poll().await {
            Ok(report) => {
                info!(
                    "Registry holds {} capsules, {} listed, {} changed",
                    report.total,
                    report.listed.len(),
                    report.changes.len()
                );
            }
            Err(e) => {
                error!("Error polling registry: {:#}", e);
            }
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                monitor.detach();
                return Ok(());
            }
            _ = tokio::time::sleep(monitor.poll_interval()) => {}
        }
    }
}
