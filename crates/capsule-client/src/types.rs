//! Common types for capsule-client

use crate::{CapsuleError, Result};
use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ================================
// Identifiers
// ================================

const OBJECT_ID_LENGTH: usize = 32;

/// 32-byte Sui object id, rendered as `0x`-prefixed hex
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId([u8; OBJECT_ID_LENGTH]);

/// Account addresses share the object id representation
pub type SuiAddress = ObjectId;

impl ObjectId {
    pub const LENGTH: usize = OBJECT_ID_LENGTH;

    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    /// Id whose last byte is `value`, e.g. `0x6` for the clock
    pub const fn from_u8(value: u8) -> Self {
        let mut bytes = [0u8; Self::LENGTH];
        bytes[Self::LENGTH - 1] = value;
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }

    /// Full-length hex form with `0x` prefix
    pub fn to_hex_literal(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for ObjectId {
    type Err = CapsuleError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);

        if digits.is_empty() || digits.len() > Self::LENGTH * 2 {
            return Err(CapsuleError::InvalidObjectId(s.to_string()));
        }

        // Short forms such as 0x6 are left-padded
        let padded = format!("{digits:0>64}");
        let mut bytes = [0u8; Self::LENGTH];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|_| CapsuleError::InvalidObjectId(s.to_string()))?;

        Ok(Self(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_literal())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({self})")
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_literal())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

// ================================
// On-chain Capsule Representation
// ================================

/// Payload bytes as they arrive from the RPC layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EncryptedContent {
    /// Hex string, with or without `0x`
    Hex(String),
    /// Numeric byte array
    Bytes(Vec<u8>),
}

impl EncryptedContent {
    /// Convert either representation into raw bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            EncryptedContent::Hex(s) => {
                let digits = s.strip_prefix("0x").unwrap_or(s);
                if digits.len() % 2 != 0 {
                    return Err(CapsuleError::DecodeFailure(format!(
                        "odd-length hex payload ({} digits)",
                        digits.len()
                    )));
                }
                hex::decode(digits).map_err(|e| CapsuleError::DecodeFailure(e.to_string()))
            }
            EncryptedContent::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Capsule object fields as stored by the `cofuture` package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCapsuleRecord {
    pub id: ObjectId,
    pub creator: SuiAddress,
    pub encrypted_content: EncryptedContent,
    #[serde(deserialize_with = "u64_string_or_number")]
    pub unlock_timestamp_ms: u64,
    pub audience: Vec<SuiAddress>,
    #[serde(deserialize_with = "u64_string_or_number")]
    pub total_reward: u64,
    #[serde(deserialize_with = "u64_string_or_number")]
    pub reward_per_user: u64,
    #[serde(deserialize_with = "u64_string_or_number")]
    pub max_claim: u64,
    #[serde(deserialize_with = "u64_string_or_number")]
    pub claimed_count: u64,
    #[serde(default, deserialize_with = "bytes_lenient")]
    pub claimed_bitmap: Vec<u8>,
}

/// Move `u64` values are rendered as decimal strings by the fullnode
pub(crate) fn u64_string_or_number<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s.parse().map_err(de::Error::custom),
    }
}

fn bytes_lenient<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Byte {
        Number(u8),
        Text(String),
    }

    Vec::<Byte>::deserialize(deserializer)?
        .into_iter()
        .map(|b| match b {
            Byte::Number(n) => Ok(n),
            Byte::Text(s) => s.parse().map_err(de::Error::custom),
        })
        .collect()
}

// ================================
// Decoded View
// ================================

/// Lifecycle state derived from timestamps and claim counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapsuleStatus {
    Locked,
    Unlockable,
    Claimed,
}

impl fmt::Display for CapsuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapsuleStatus::Locked => write!(f, "locked"),
            CapsuleStatus::Unlockable => write!(f, "unlockable"),
            CapsuleStatus::Claimed => write!(f, "claimed"),
        }
    }
}

/// Normalized capsule, recomputed on every read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capsule {
    pub id: ObjectId,
    pub creator_address: SuiAddress,
    pub unlock_timestamp_ms: u64,
    pub unlock_date: DateTime<Utc>,
    pub status: CapsuleStatus,
    pub message: String,
    pub is_private: bool,
    /// Total reward in MIST, present only when non-zero
    pub token_amount: Option<u64>,
    pub audience: Vec<SuiAddress>,
    pub reward_per_user: u64,
    pub max_claim: u64,
    pub claimed_count: u64,

    // Not stored by the on-chain schema; always empty.
    pub title: Option<String>,
    pub nft_id: Option<ObjectId>,
    pub nft_name: Option<String>,
    pub nft_collection: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

// ================================
// Execution Results
// ================================

/// Normalized outcome of a submitted transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub success: bool,
    pub digest: Option<String>,
    pub created_object_ids: Vec<ObjectId>,
    /// First created object of the capsule type, if any
    pub capsule_id: Option<ObjectId>,
    pub error: Option<String>,
}

impl TransactionResult {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn failed_with_digest(digest: String, error: impl Into<String>) -> Self {
        Self {
            digest: Some(digest),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Turn a failed result into `RemoteExecutionFailure`
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(CapsuleError::RemoteExecutionFailure(
                self.error
                    .unwrap_or_else(|| "Transaction failed".to_string()),
            ))
        }
    }
}
