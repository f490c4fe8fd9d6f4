//! Raw capsule records → decoded view

use crate::{
    types::{Capsule, CapsuleStatus, EncryptedContent, RawCapsuleRecord},
    CapsuleError, Result,
};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Shown in place of a payload that cannot be decoded
pub const UNDECODABLE_MESSAGE: &str = "< undecodable >";

/// Lifecycle state at `now_ms`. Order matters: the unlock time is checked
/// before the claim counters.
pub fn derive_status(
    now_ms: u64,
    unlock_timestamp_ms: u64,
    claimed_count: u64,
    max_claim: u64,
) -> CapsuleStatus {
    if now_ms < unlock_timestamp_ms {
        CapsuleStatus::Locked
    } else if claimed_count < max_claim {
        CapsuleStatus::Unlockable
    } else {
        CapsuleStatus::Claimed
    }
}

/// Payload bytes as UTF-8 text
pub fn decode_payload(content: &EncryptedContent) -> Result<String> {
    let bytes = content.to_bytes()?;
    if bytes.is_empty() {
        return Err(CapsuleError::DecodeFailure("empty payload".to_string()));
    }
    String::from_utf8(bytes).map_err(|e| CapsuleError::DecodeFailure(e.to_string()))
}

/// Decode one record. Pure and total: a bad payload yields
/// [`UNDECODABLE_MESSAGE`] instead of an error.
pub fn decode(raw: &RawCapsuleRecord, now_ms: u64) -> Capsule {
    let status = derive_status(
        now_ms,
        raw.unlock_timestamp_ms,
        raw.claimed_count,
        raw.max_claim,
    );

    let message = decode_payload(&raw.encrypted_content).unwrap_or_else(|e| {
        debug!("Capsule {}: {}", raw.id, e);
        UNDECODABLE_MESSAGE.to_string()
    });

    let is_private = matches!(raw.audience.as_slice(), [only] if *only == raw.creator);

    Capsule {
        id: raw.id,
        creator_address: raw.creator,
        unlock_timestamp_ms: raw.unlock_timestamp_ms,
        unlock_date: millis_to_date(raw.unlock_timestamp_ms),
        status,
        message,
        is_private,
        token_amount: (raw.total_reward != 0).then_some(raw.total_reward),
        audience: raw.audience.clone(),
        reward_per_user: raw.reward_per_user,
        max_claim: raw.max_claim,
        claimed_count: raw.claimed_count,
        title: None,
        nft_id: None,
        nft_name: None,
        nft_collection: None,
        claimed_at: None,
        created_at: None,
    }
}

/// Decode a whole list against one clock reading
pub fn decode_all(records: &[RawCapsuleRecord], now_ms: u64) -> Vec<Capsule> {
    records.iter().map(|raw| decode(raw, now_ms)).collect()
}

/// Current wall-clock time in milliseconds
pub fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

fn millis_to_date(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
