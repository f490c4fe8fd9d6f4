//! User form input → transaction parameters

use crate::{
    transaction::builder::{CoinSource, SendCapsuleParams},
    types::SuiAddress,
    units::parse_sui_amount,
    CapsuleError, Config, Result,
};
use chrono::{DateTime, Utc};

/// Who may claim the capsule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visibility {
    /// Only the creator
    Private,
    /// The listed recipients plus the creator
    Shared(Vec<SuiAddress>),
}

/// Contents of the "create time capsule" form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCapsuleForm {
    pub message: String,
    pub unlock_at: DateTime<Utc>,
    pub visibility: Visibility,
    /// Reward per recipient in SUI, blank for none
    pub token_amount: Option<String>,
}

impl SendCapsuleForm {
    /// Validate and convert; nothing here touches the network
    pub fn into_params(
        self,
        now: DateTime<Utc>,
        sender: SuiAddress,
        config: &Config,
        coin: CoinSource,
    ) -> Result<SendCapsuleParams> {
        if self.message.trim().is_empty() {
            return Err(CapsuleError::InvalidInput("Message is required".to_string()));
        }

        let unlock_duration_ms = (self.unlock_at - now).num_milliseconds();
        if unlock_duration_ms <= 0 {
            return Err(CapsuleError::InvalidInput(
                "Unlock date must be in the future".to_string(),
            ));
        }

        let reward_per_user = match self.token_amount.as_deref().map(str::trim) {
            None | Some("") => 0,
            Some(amount) => parse_sui_amount(amount)?,
        };

        let audience = match self.visibility {
            Visibility::Private => vec![sender],
            Visibility::Shared(recipients) => {
                let mut audience: Vec<SuiAddress> = Vec::with_capacity(recipients.len() + 1);
                for address in recipients.into_iter().chain(std::iter::once(sender)) {
                    if !audience.contains(&address) {
                        audience.push(address);
                    }
                }
                audience
            }
        };

        Ok(SendCapsuleParams {
            vault_id: config.vault_id,
            coin,
            encrypted_content: self.message.into_bytes(),
            unlock_duration_ms,
            audience,
            reward_per_user,
            registry_id: config.registry_id,
            clock_id: config.clock_id,
        })
    }
}
