//! Core client types: configuration and error handling

use crate::types::ObjectId;
use std::time::Duration;
use thiserror::Error;

// ================================
// Configuration Types
// ================================

/// Public Sui testnet fullnode
pub const DEFAULT_RPC_URL: &str = "https://fullnode.testnet.sui.io";

/// Value used for any object id that was not configured
pub const PLACEHOLDER_OBJECT_ID: &str = "0x1";

/// Well-known shared `Clock` object
pub const DEFAULT_CLOCK_ID: &str = "0x6";

/// Client configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC endpoint URL
    pub rpc_url: String,

    /// Request timeout for JSON-RPC calls
    pub rpc_timeout: Duration,

    /// Package that publishes the `cofuture` module
    pub package_id: String,

    /// Shared vault holding pooled rewards
    pub vault_id: ObjectId,

    /// Registry listing every live capsule
    pub registry_id: ObjectId,

    /// Coin object used when the gas coin is not the funding source
    pub coin_id: ObjectId,

    /// Shared clock object
    pub clock_id: ObjectId,

    /// Names of the settings that fell back to a placeholder
    placeholders: Vec<&'static str>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            rpc_timeout: Duration::from_secs(30),
            package_id: String::new(),
            vault_id: ObjectId::from_u8(1),
            registry_id: ObjectId::from_u8(1),
            coin_id: ObjectId::from_u8(1),
            clock_id: ObjectId::from_u8(6),
            placeholders: vec![
                "PACKAGE_ID",
                "VAULT_OBJECT_ID",
                "CAPSULE_REGISTRY_OBJECT_ID",
                "COIN_OBJECT_ID",
            ],
        }
    }
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut placeholders = Vec::new();

        // Empty values count as unset
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut object_id = |key: &'static str, default: &str| -> Result<ObjectId> {
            match read(key) {
                Some(value) => value.trim().parse().map_err(|e| {
                    CapsuleError::InvalidConfiguration(format!("{key}: {e}"))
                }),
                None => {
                    if default == PLACEHOLDER_OBJECT_ID {
                        placeholders.push(key);
                    }
                    default
                        .parse()
                        .map_err(|e| CapsuleError::InvalidConfiguration(format!("{key}: {e}")))
                }
            }
        };

        let vault_id = object_id("VAULT_OBJECT_ID", PLACEHOLDER_OBJECT_ID)?;
        let registry_id = object_id("CAPSULE_REGISTRY_OBJECT_ID", PLACEHOLDER_OBJECT_ID)?;
        let coin_id = object_id("COIN_OBJECT_ID", PLACEHOLDER_OBJECT_ID)?;
        let clock_id = object_id("CLOCK_ID", DEFAULT_CLOCK_ID)?;

        let package_id = match read("PACKAGE_ID") {
            Some(value) => {
                let value = value.trim().to_string();
                value.parse::<ObjectId>().map_err(|e| {
                    CapsuleError::InvalidConfiguration(format!("PACKAGE_ID: {e}"))
                })?;
                value
            }
            None => {
                placeholders.insert(0, "PACKAGE_ID");
                String::new()
            }
        };

        let rpc_timeout = match read("RPC_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(value.trim().parse().map_err(|_| {
                CapsuleError::InvalidConfiguration(format!("RPC_TIMEOUT_SECS: {value}"))
            })?),
            None => Duration::from_secs(30),
        };

        Ok(Self {
            rpc_url: read("RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
            rpc_timeout,
            package_id,
            vault_id,
            registry_id,
            coin_id,
            clock_id,
            placeholders,
        })
    }

    /// Settings that were not provided and still hold a placeholder.
    ///
    /// Calls against a placeholder object reach the wrong object on chain,
    /// so callers should surface these at startup.
    pub fn placeholder_fields(&self) -> &[&'static str] {
        &self.placeholders
    }

    /// Fully qualified type of capsule objects published by the package,
    /// with the package address in its long form
    pub fn capsule_type(&self) -> String {
        let package = self
            .package_id
            .parse::<ObjectId>()
            .map_or_else(|_| self.package_id.clone(), |id| id.to_hex_literal());
        format!("{package}::cofuture::Capsule")
    }
}

// ================================
// Error Types
// ================================

#[derive(Debug, Error)]
pub enum CapsuleError {
    #[error("Invalid registry object: {0}")]
    InvalidRegistry(String),

    #[error("Failed to decode capsule payload: {0}")]
    DecodeFailure(String),

    #[error("Please connect your Sui wallet")]
    WalletNotConnected,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transaction failed: {0}")]
    RemoteExecutionFailure(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("HTTP error: {0}")]
    Http(Box<reqwest::Error>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid object id: {0}")]
    InvalidObjectId(String),

    #[error("A submission is already in flight")]
    SubmissionInFlight,
}

impl From<reqwest::Error> for CapsuleError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CapsuleError>;
