//! Periodic registry reads and status transition logging

use crate::config::Config;
use anyhow::Result;
use capsule_client::{
    format_sui_amount, short_address, Capsule, CapsuleBoard, CapsuleClient, CapsuleFilter,
    CapsuleStatus, ObjectId,
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// A capsule whose status differs from the previous poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub id: ObjectId,
    /// `None` for capsules seen for the first time
    pub from: Option<CapsuleStatus>,
    pub to: CapsuleStatus,
}

/// Outcome of one poll
#[derive(Debug, Clone, Default)]
pub struct PollReport {
    pub total: usize,
    pub listed: Vec<Capsule>,
    pub changes: Vec<StatusChange>,
}

pub struct CapsuleMonitor {
    board: CapsuleBoard,
    filter: CapsuleFilter,
    poll_interval: Duration,
    last_seen: HashMap<ObjectId, CapsuleStatus>,
}

impl CapsuleMonitor {
    pub fn new(client: &CapsuleClient, config: &Config) -> Self {
        Self {
            board: client.board(),
            filter: config.filter,
            poll_interval: config.poll_interval(),
            last_seen: HashMap::new(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Refresh the board and report what changed since the last poll
    pub async fn poll(&mut self) -> Result<PollReport> {
        self.board.refresh().await?;

        let state = self.board.state().await;
        let changes = status_changes(&self.last_seen, &state.capsules);
        self.last_seen = state.capsules.iter().map(|c| (c.id, c.status)).collect();

        for change in &changes {
            match change.from {
                Some(from) => info!("Capsule {} moved {} -> {}", change.id, from, change.to),
                None => debug!("New capsule {} ({})", change.id, change.to),
            }
        }

        let listed = self.board.filtered(self.filter).await;
        for capsule in &listed {
            info!(
                "{} [{}] from {} unlocks {} claims {}/{}{}",
                capsule.id,
                capsule.status,
                short_address(&capsule.creator_address),
                capsule.unlock_date.to_rfc3339(),
                capsule.claimed_count,
                capsule.max_claim,
                capsule
                    .token_amount
                    .map(|mist| format!(" reward {} SUI", format_sui_amount(mist)))
                    .unwrap_or_default(),
            );
        }

        Ok(PollReport {
            total: state.capsules.len(),
            listed,
            changes,
        })
    }

    pub fn detach(&self) {
        self.board.detach();
    }
}

/// Capsules that are new or whose status differs from `previous`
pub fn status_changes(
    previous: &HashMap<ObjectId, CapsuleStatus>,
    current: &[Capsule],
) -> Vec<StatusChange> {
    current
        .iter()
        .filter_map(|capsule| {
            let from = previous.get(&capsule.id).copied();
            (from != Some(capsule.status)).then_some(StatusChange {
                id: capsule.id,
                from,
                to: capsule.status,
            })
        })
        .collect()
}
