//! Wallet signing seam
//!
//! Key management and transaction-byte serialization belong to an external
//! wallet. The client only hands it a structured transaction and receives
//! signed bytes back. The connected wallet travels through an explicit
//! [`WalletContext`] so every operation that needs a signer says so.

use crate::{
    transaction::builder::TransactionData,
    types::SuiAddress,
    CapsuleError, Result,
};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Signed transaction ready for `sui_executeTransactionBlock`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    /// Base64 BCS `TransactionData`
    pub tx_bytes: String,

    /// Base64 serialized signatures
    pub signatures: Vec<String>,
}

impl SignedTransaction {
    pub fn from_raw(tx_bytes: &[u8], signatures: &[Vec<u8>]) -> Self {
        let engine = base64::engine::general_purpose::STANDARD;
        Self {
            tx_bytes: engine.encode(tx_bytes),
            signatures: signatures.iter().map(|s| engine.encode(s)).collect(),
        }
    }

    /// Reject payloads that cannot be submitted
    pub fn validate(&self) -> Result<()> {
        let engine = base64::engine::general_purpose::STANDARD;

        let bytes = engine
            .decode(&self.tx_bytes)
            .map_err(|e| CapsuleError::RemoteExecutionFailure(format!("malformed transaction bytes: {e}")))?;
        if bytes.is_empty() {
            return Err(CapsuleError::RemoteExecutionFailure(
                "wallet returned empty transaction bytes".to_string(),
            ));
        }
        if self.signatures.is_empty() {
            return Err(CapsuleError::RemoteExecutionFailure(
                "wallet returned no signatures".to_string(),
            ));
        }
        for signature in &self.signatures {
            engine
                .decode(signature)
                .map_err(|e| CapsuleError::RemoteExecutionFailure(format!("malformed signature: {e}")))?;
        }
        Ok(())
    }
}

/// External wallet able to sign for one address
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Address of the connected account
    fn address(&self) -> SuiAddress;

    /// Resolve, serialize and sign the transaction
    async fn sign_transaction(&self, transaction: TransactionData) -> Result<SignedTransaction>;
}

/// Signing identity bound to one call, if any
#[derive(Clone, Default)]
pub struct WalletContext {
    signer: Option<Arc<dyn WalletSigner>>,
}

impl WalletContext {
    pub fn connected(signer: Arc<dyn WalletSigner>) -> Self {
        Self {
            signer: Some(signer),
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.signer.is_some()
    }

    pub fn address(&self) -> Option<SuiAddress> {
        self.signer.as_ref().map(|s| s.address())
    }

    /// Signer for the current call, or `WalletNotConnected`
    pub fn signer(&self) -> Result<&Arc<dyn WalletSigner>> {
        self.signer.as_ref().ok_or(CapsuleError::WalletNotConnected)
    }
}

impl std::fmt::Debug for WalletContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletContext")
            .field("address", &self.address())
            .finish()
    }
}

/// Display form `0x1234...abcd`
pub fn short_address(address: &SuiAddress) -> String {
    let full = address.to_hex_literal();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}
