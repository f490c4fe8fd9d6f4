//! Sign, submit and normalize built transactions

use crate::{
    rpc::{ObjectChange, SuiRpc, TransactionBlockResponse},
    transaction::builder::PreparedTransaction,
    types::{ObjectId, TransactionResult},
    wallet::WalletContext,
    Config,
};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Submits transactions. Never retries: a resubmitted split could spend
/// the same coin twice.
pub struct TransactionExecutor {
    rpc: Arc<dyn SuiRpc>,
    /// Type of capsules created by the configured package
    capsule_type: String,
}

impl TransactionExecutor {
    pub fn new(rpc: Arc<dyn SuiRpc>, config: &Config) -> Self {
        Self {
            rpc,
            capsule_type: config.capsule_type(),
        }
    }

    /// Package address is compared in its long form
    fn is_capsule_type(&self, object_type: &str) -> bool {
        let Some((address, rest)) = object_type.split_once("::") else {
            return false;
        };
        address
            .parse::<ObjectId>()
            .is_ok_and(|id| format!("{}::{rest}", id.to_hex_literal()) == self.capsule_type)
    }

    /// Sign with the bound wallet and submit; failures land in the result
    pub async fn execute(&self, wallet: &WalletContext, prepared: PreparedTransaction) -> TransactionResult {
        let signer = match wallet.signer() {
            Ok(signer) => signer,
            Err(e) => return TransactionResult::failed(e.to_string()),
        };

        let kind = prepared.kind;
        info!("Executing {:?} ({})", kind, prepared.target);

        let signed = match signer.sign_transaction(prepared.into_data()).await {
            Ok(signed) => signed,
            Err(e) => {
                warn!("Wallet rejected {:?}: {}", kind, e);
                return TransactionResult::failed(e.to_string());
            }
        };
        if let Err(e) = signed.validate() {
            return TransactionResult::failed(e.to_string());
        }

        match self.rpc.execute_transaction_block(signed).await {
            Ok(response) => self.normalize(response),
            Err(e) => {
                error!("Submission of {:?} failed: {}", kind, e);
                TransactionResult::failed(e.to_string())
            }
        }
    }

    fn normalize(&self, response: TransactionBlockResponse) -> TransactionResult {
        let TransactionBlockResponse {
            digest,
            effects,
            object_changes,
        } = response;

        if let Some(status) = effects.map(|effects| effects.status) {
            if !status.is_success() {
                let message = status
                    .error
                    .unwrap_or_else(|| format!("execution status {}", status.status));
                warn!("Transaction {} failed on chain: {}", digest, message);
                return TransactionResult::failed_with_digest(digest, message);
            }
        }

        let created: Vec<_> = object_changes
            .unwrap_or_default()
            .into_iter()
            .filter_map(|change| match change {
                ObjectChange::Created {
                    object_id,
                    object_type,
                } => Some((object_id, object_type)),
                ObjectChange::Other => None,
            })
            .collect();

        let capsule_id = created
            .iter()
            .find(|(_, object_type)| self.is_capsule_type(object_type))
            .map(|(id, _)| *id);

        info!("Transaction {} succeeded, {} objects created", digest, created.len());

        TransactionResult {
            success: true,
            digest: Some(digest),
            created_object_ids: created.into_iter().map(|(id, _)| id).collect(),
            capsule_id,
            error: None,
        }
    }
}
