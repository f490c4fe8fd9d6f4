//! Capsule Client
//!
//! Off-chain client for the `cofuture` time-capsule package on Sui.
//! Reads the capsule registry, decodes capsules for display and builds
//! transactions that an external wallet signs.

// ================================
// Module Declarations
// ================================

pub mod core;
pub mod types;

// Chain access
pub mod rpc;
pub mod wallet;

// Transaction building and submission
pub mod transaction {
    pub mod builder;
    pub mod commands;

    pub use builder::{
        ClaimCapsuleParams, CoinSource, DepositParams, PreparedTransaction, SendCapsuleParams,
        TransactionBuilder, TransactionData, TransactionKind,
    };
    pub use commands::{Argument, CallArg, Command, MoveCall, ProgrammableTransaction, PureValue};
}
pub mod executor;

// Reading and presentation
pub mod registry;
pub mod decoder;
pub mod board;

// Input helpers
pub mod forms;
pub mod units;
pub mod nft;

// ================================
// Public API Re-exports
// ================================

pub use crate::core::{CapsuleError, Config, Result};

pub use types::{
    Capsule, CapsuleStatus, EncryptedContent, ObjectId, RawCapsuleRecord, SuiAddress,
    TransactionResult,
};

pub use rpc::{JsonRpcClient, SuiRpc};
pub use wallet::{short_address, SignedTransaction, WalletContext, WalletSigner};

pub use transaction::TransactionBuilder;
pub use executor::TransactionExecutor;

pub use registry::RegistryReader;
pub use decoder::{decode, decode_all, derive_status, UNDECODABLE_MESSAGE};
pub use board::{filter_capsules, BoardState, CapsuleBoard, CapsuleFilter};

pub use forms::{SendCapsuleForm, Visibility};
pub use units::{format_sui_amount, parse_sui_amount, MIST_PER_SUI};
pub use nft::{fetch_owned_nfts, NftSummary, DEFAULT_NFT_TYPE};

// ================================
// Client
// ================================

use std::sync::Arc;
use tracing::info;

/// Entry point bundling configuration with one RPC connection
#[derive(Clone)]
pub struct CapsuleClient {
    config: Config,
    rpc: Arc<dyn SuiRpc>,
}

impl CapsuleClient {
    /// Connect to `config.rpc_url` over HTTP
    pub fn new(config: Config) -> Result<Self> {
        info!("Initializing capsule client against {}", config.rpc_url);
        let rpc = Arc::new(JsonRpcClient::new(&config)?);
        Ok(Self::with_rpc(config, rpc))
    }

    pub fn with_rpc(config: Config, rpc: Arc<dyn SuiRpc>) -> Self {
        Self { config, rpc }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn rpc(&self) -> Arc<dyn SuiRpc> {
        self.rpc.clone()
    }

    /// Fetch and decode every capsule in the configured registry
    pub async fn fetch_capsules(&self) -> Result<Vec<Capsule>> {
        let records = RegistryReader::new(self.rpc.clone())
            .fetch_capsules(self.config.registry_id)
            .await?;
        Ok(decode_all(&records, decoder::now_ms()))
    }

    pub fn transaction_builder(&self) -> TransactionBuilder {
        TransactionBuilder::from_config(&self.config)
    }

    pub fn executor(&self) -> TransactionExecutor {
        TransactionExecutor::new(self.rpc.clone(), &self.config)
    }

    /// Fresh board bound to this client
    pub fn board(&self) -> CapsuleBoard {
        CapsuleBoard::new(self.rpc.clone(), self.config.clone())
    }

    /// NFTs of the default devnet type held by `owner`
    pub async fn owned_nfts(&self, owner: SuiAddress) -> Vec<NftSummary> {
        fetch_owned_nfts(self.rpc.as_ref(), owner, DEFAULT_NFT_TYPE).await
    }
}

impl std::fmt::Debug for CapsuleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapsuleClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
