//! Transaction construction for the `cofuture` entry points

use super::commands::{Argument, ProgrammableTransaction, ProgrammableTransactionBuilder, PureValue};
use crate::{
    types::{ObjectId, SuiAddress},
    units::parse_sui_amount,
    wallet::WalletContext,
    CapsuleError, Config, Result,
};
use serde::Serialize;
use tracing::{debug, info};

/// Move module published by the capsule package
pub const CAPSULE_MODULE: &str = "cofuture";

pub const DEPOSIT_FUNCTION: &str = "deposit";
pub const SEND_CAPSULE_FUNCTION: &str = "send_capsule";
pub const CLAIM_CAPSULE_FUNCTION: &str = "claim_capsule";

// ================================
// Parameters
// ================================

/// Coin that funds a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoinSource {
    /// The gas coin of the sender
    Gas,
    /// A specific coin object
    Object(ObjectId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositParams {
    pub vault_id: ObjectId,
    pub coin: CoinSource,
    /// Decimal amount in SUI
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendCapsuleParams {
    pub vault_id: ObjectId,
    pub coin: CoinSource,
    pub encrypted_content: Vec<u8>,
    pub unlock_duration_ms: i64,
    pub audience: Vec<SuiAddress>,
    /// Reward per audience member, in MIST
    pub reward_per_user: u64,
    pub registry_id: ObjectId,
    pub clock_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimCapsuleParams {
    pub vault_id: ObjectId,
    pub capsule_id: ObjectId,
    pub clock_id: ObjectId,
}

// ================================
// Built Transactions
// ================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransactionKind {
    Deposit,
    SendCapsule,
    ClaimCapsule,
}

/// One built operation, handed to the executor exactly once
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct PreparedTransaction {
    pub kind: TransactionKind,
    /// `package::cofuture::function`
    pub target: String,
    pub sender: SuiAddress,
    pub transaction: ProgrammableTransaction,
    pub gas_budget: Option<u64>,
}

impl PreparedTransaction {
    pub fn into_data(self) -> TransactionData {
        TransactionData {
            sender: self.sender,
            transaction: self.transaction,
            gas_budget: self.gas_budget,
        }
    }
}

/// What the wallet signs
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct TransactionData {
    pub sender: SuiAddress,
    pub transaction: ProgrammableTransaction,
    /// Left to the wallet when unset
    pub gas_budget: Option<u64>,
}

// ================================
// Builder
// ================================

/// Builds deposit, send and claim transactions.
///
/// Arguments are positional on chain: the order pushed here must match the
/// entry point signatures exactly.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    package_id: String,
    gas_budget: Option<u64>,
}

impl TransactionBuilder {
    pub fn new(package_id: impl Into<String>) -> Self {
        Self {
            package_id: package_id.into(),
            gas_budget: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.package_id.clone())
    }

    /// Set gas budget
    pub fn with_gas_budget(mut self, budget: u64) -> Self {
        self.gas_budget = Some(budget);
        self
    }

    fn target(&self, function: &str) -> String {
        format!("{}::{CAPSULE_MODULE}::{function}", self.package_id)
    }

    fn coin_argument(ptb: &mut ProgrammableTransactionBuilder, coin: CoinSource) -> Argument {
        match coin {
            CoinSource::Gas => Argument::GasCoin,
            CoinSource::Object(id) => ptb.object(id),
        }
    }

    fn finish(
        &self,
        kind: TransactionKind,
        function: &str,
        sender: SuiAddress,
        ptb: ProgrammableTransactionBuilder,
    ) -> PreparedTransaction {
        let prepared = PreparedTransaction {
            kind,
            target: self.target(function),
            sender,
            transaction: ptb.finish(),
            gas_budget: self.gas_budget,
        };
        debug!(
            "Built {:?} with {} inputs and {} commands",
            prepared.kind,
            prepared.transaction.inputs.len(),
            prepared.transaction.commands.len()
        );
        prepared
    }

    /// `deposit(vault, coin, amount)`
    pub fn deposit(&self, wallet: &WalletContext, params: DepositParams) -> Result<PreparedTransaction> {
        let sender = wallet.address().ok_or(CapsuleError::WalletNotConnected)?;
        let amount = parse_sui_amount(&params.amount)?;
        info!("Building deposit of {} MIST into {}", amount, params.vault_id);

        let mut ptb = ProgrammableTransactionBuilder::new();
        let source = Self::coin_argument(&mut ptb, params.coin);
        let split_amount = ptb.pure(PureValue::U64(amount));
        let coin = ptb.split_coins(source, vec![split_amount]);

        let vault = ptb.object(params.vault_id);
        let amount_arg = ptb.pure(PureValue::U64(amount));
        ptb.move_call(
            &self.package_id,
            CAPSULE_MODULE,
            DEPOSIT_FUNCTION,
            vec![vault, coin, amount_arg],
        );

        Ok(self.finish(TransactionKind::Deposit, DEPOSIT_FUNCTION, sender, ptb))
    }

    /// `send_capsule(vault, coin, content, unlock_duration_ms, audience,
    /// reward_per_user, clock, registry)`, then the split coin goes back to
    /// the sender.
    pub fn send_capsule(
        &self,
        wallet: &WalletContext,
        params: SendCapsuleParams,
    ) -> Result<PreparedTransaction> {
        let sender = wallet.address().ok_or(CapsuleError::WalletNotConnected)?;

        if params.unlock_duration_ms <= 0 {
            return Err(CapsuleError::InvalidInput(
                "Unlock date must be in the future".to_string(),
            ));
        }
        if params.audience.is_empty() {
            return Err(CapsuleError::InvalidInput(
                "Audience must contain at least one address".to_string(),
            ));
        }

        let audience_len = params.audience.len() as u64;
        let total_reward = params
            .reward_per_user
            .checked_mul(audience_len)
            .ok_or_else(|| CapsuleError::InvalidInput("Total reward overflows".to_string()))?;
        info!(
            "Building send_capsule: {} recipients, total reward {} MIST",
            audience_len, total_reward
        );

        let mut ptb = ProgrammableTransactionBuilder::new();
        let source = Self::coin_argument(&mut ptb, params.coin);
        let split_amount = ptb.pure(PureValue::U64(total_reward));
        let coin = ptb.split_coins(source, vec![split_amount]);

        let vault = ptb.object(params.vault_id);
        let content = ptb.pure(PureValue::Bytes(params.encrypted_content));
        let duration = ptb.pure(PureValue::U64(params.unlock_duration_ms as u64));
        let audience = ptb.pure(PureValue::Addresses(params.audience));
        let reward = ptb.pure(PureValue::U64(params.reward_per_user));
        let clock = ptb.object(params.clock_id);
        let registry = ptb.object(params.registry_id);
        ptb.move_call(
            &self.package_id,
            CAPSULE_MODULE,
            SEND_CAPSULE_FUNCTION,
            vec![vault, coin, content, duration, audience, reward, clock, registry],
        );

        // The call borrows the split coin; whatever remains returns to the sender
        let recipient = ptb.pure(PureValue::Address(sender));
        ptb.transfer_objects(vec![coin], recipient);

        Ok(self.finish(TransactionKind::SendCapsule, SEND_CAPSULE_FUNCTION, sender, ptb))
    }

    /// `claim_capsule(vault, capsule, clock)`; eligibility is checked on chain
    pub fn claim_capsule(
        &self,
        wallet: &WalletContext,
        params: ClaimCapsuleParams,
    ) -> Result<PreparedTransaction> {
        let sender = wallet.address().ok_or(CapsuleError::WalletNotConnected)?;
        info!("Building claim_capsule for {}", params.capsule_id);

        let mut ptb = ProgrammableTransactionBuilder::new();
        let vault = ptb.object(params.vault_id);
        let capsule = ptb.object(params.capsule_id);
        let clock = ptb.object(params.clock_id);
        ptb.move_call(
            &self.package_id,
            CAPSULE_MODULE,
            CLAIM_CAPSULE_FUNCTION,
            vec![vault, capsule, clock],
        );

        Ok(self.finish(TransactionKind::ClaimCapsule, CLAIM_CAPSULE_FUNCTION, sender, ptb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::commands::{CallArg, Command};
    use crate::wallet::MockWalletSigner;
    use std::sync::Arc;

    const PACKAGE: &str = "0xabc";

    fn sender() -> SuiAddress {
        ObjectId::from_u8(0xaa)
    }

    fn wallet() -> WalletContext {
        let mut signer = MockWalletSigner::new();
        signer.expect_address().return_const(sender());
        WalletContext::connected(Arc::new(signer))
    }

    fn call_inputs(prepared: &PreparedTransaction) -> Vec<CallArg> {
        let call = prepared.transaction.move_calls().next().unwrap();
        call.arguments
            .iter()
            .map(|arg| match arg {
                Argument::Input(_) => prepared.transaction.input(*arg).unwrap().clone(),
                other => panic!("unexpected non-input argument {other:?}"),
            })
            .collect()
    }

    fn send_params(reward_per_user: u64, audience: Vec<SuiAddress>) -> SendCapsuleParams {
        SendCapsuleParams {
            vault_id: ObjectId::from_u8(0x10),
            coin: CoinSource::Gas,
            encrypted_content: b"hello".to_vec(),
            unlock_duration_ms: 60_000,
            audience,
            reward_per_user,
            registry_id: ObjectId::from_u8(0x11),
            clock_id: ObjectId::from_u8(6),
        }
    }

    #[test]
    fn test_deposit_converts_to_mist() {
        let prepared = TransactionBuilder::new(PACKAGE)
            .deposit(
                &wallet(),
                DepositParams {
                    vault_id: ObjectId::from_u8(0x10),
                    coin: CoinSource::Gas,
                    amount: "2.5".to_string(),
                },
            )
            .unwrap();

        assert_eq!(prepared.kind, TransactionKind::Deposit);
        assert_eq!(prepared.target, "0xabc::cofuture::deposit");
        assert_eq!(
            prepared.transaction.commands[0],
            Command::SplitCoins(Argument::GasCoin, vec![Argument::Input(0)])
        );

        let call = prepared.transaction.move_calls().next().unwrap();
        assert_eq!(call.arguments[1], Argument::NestedResult(0, 0));
        assert_eq!(prepared.transaction.input(call.arguments[0]), Some(&CallArg::Object(ObjectId::from_u8(0x10))));
        assert_eq!(
            prepared.transaction.input(call.arguments[2]),
            Some(&CallArg::Pure(PureValue::U64(2_500_000_000)))
        );
    }

    #[test]
    fn test_deposit_from_coin_object() {
        let coin_id = ObjectId::from_u8(0x12);
        let prepared = TransactionBuilder::new(PACKAGE)
            .deposit(
                &wallet(),
                DepositParams {
                    vault_id: ObjectId::from_u8(0x10),
                    coin: CoinSource::Object(coin_id),
                    amount: "1".to_string(),
                },
            )
            .unwrap();

        match &prepared.transaction.commands[0] {
            Command::SplitCoins(source, _) => {
                assert_eq!(prepared.transaction.input(*source), Some(&CallArg::Object(coin_id)));
            }
            other => panic!("expected SplitCoins, got {other:?}"),
        }
    }

    #[test]
    fn test_send_capsule_total_reward_and_argument_order() {
        let audience = vec![ObjectId::from_u8(1), ObjectId::from_u8(2), sender()];
        let prepared = TransactionBuilder::new(PACKAGE)
            .send_capsule(&wallet(), send_params(100, audience.clone()))
            .unwrap();

        assert_eq!(prepared.target, "0xabc::cofuture::send_capsule");

        // Split amount is reward_per_user * audience size
        match &prepared.transaction.commands[0] {
            Command::SplitCoins(Argument::GasCoin, amounts) => {
                assert_eq!(
                    prepared.transaction.input(amounts[0]),
                    Some(&CallArg::Pure(PureValue::U64(300)))
                );
            }
            other => panic!("expected SplitCoins from gas, got {other:?}"),
        }

        let call = prepared.transaction.move_calls().next().unwrap();
        assert_eq!(call.arguments.len(), 8);
        assert_eq!(call.arguments[1], Argument::NestedResult(0, 0));

        let resolved: Vec<Option<&CallArg>> = call
            .arguments
            .iter()
            .map(|arg| prepared.transaction.input(*arg))
            .collect();
        assert_eq!(resolved[0], Some(&CallArg::Object(ObjectId::from_u8(0x10))));
        assert_eq!(resolved[2], Some(&CallArg::Pure(PureValue::Bytes(b"hello".to_vec()))));
        assert_eq!(resolved[3], Some(&CallArg::Pure(PureValue::U64(60_000))));
        assert_eq!(resolved[4], Some(&CallArg::Pure(PureValue::Addresses(audience))));
        assert_eq!(resolved[5], Some(&CallArg::Pure(PureValue::U64(100))));
        assert_eq!(resolved[6], Some(&CallArg::Object(ObjectId::from_u8(6))));
        assert_eq!(resolved[7], Some(&CallArg::Object(ObjectId::from_u8(0x11))));
    }

    #[test]
    fn test_send_capsule_returns_leftover_coin() {
        let prepared = TransactionBuilder::new(PACKAGE)
            .send_capsule(&wallet(), send_params(0, vec![sender()]))
            .unwrap();

        match prepared.transaction.commands.last().unwrap() {
            Command::TransferObjects(objects, recipient) => {
                assert_eq!(objects, &vec![Argument::NestedResult(0, 0)]);
                assert_eq!(
                    prepared.transaction.input(*recipient),
                    Some(&CallArg::Pure(PureValue::Address(sender())))
                );
            }
            other => panic!("expected TransferObjects, got {other:?}"),
        }
    }

    #[test]
    fn test_send_capsule_rejects_non_future_unlock() {
        let builder = TransactionBuilder::new(PACKAGE);
        for duration in [0, -1, i64::MIN] {
            let mut params = send_params(1, vec![sender()]);
            params.unlock_duration_ms = duration;
            assert!(matches!(
                builder.send_capsule(&wallet(), params),
                Err(CapsuleError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_send_capsule_rejects_reward_overflow() {
        let params = send_params(u64::MAX, vec![sender(), ObjectId::from_u8(1)]);
        assert!(matches!(
            TransactionBuilder::new(PACKAGE).send_capsule(&wallet(), params),
            Err(CapsuleError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_claim_capsule_argument_order() {
        let capsule_id = ObjectId::from_u8(0x42);
        let prepared = TransactionBuilder::new(PACKAGE)
            .with_gas_budget(10_000_000)
            .claim_capsule(
                &wallet(),
                ClaimCapsuleParams {
                    vault_id: ObjectId::from_u8(0x10),
                    capsule_id,
                    clock_id: ObjectId::from_u8(6),
                },
            )
            .unwrap();

        assert_eq!(prepared.target, "0xabc::cofuture::claim_capsule");
        assert_eq!(prepared.gas_budget, Some(10_000_000));
        assert_eq!(
            call_inputs(&prepared),
            vec![
                CallArg::Object(ObjectId::from_u8(0x10)),
                CallArg::Object(capsule_id),
                CallArg::Object(ObjectId::from_u8(6)),
            ]
        );
    }

    #[test]
    fn test_every_operation_requires_wallet() {
        let builder = TransactionBuilder::new(PACKAGE);
        let wallet = WalletContext::disconnected();

        assert!(matches!(
            builder.deposit(
                &wallet,
                DepositParams {
                    vault_id: ObjectId::from_u8(0x10),
                    coin: CoinSource::Gas,
                    amount: "1".to_string(),
                }
            ),
            Err(CapsuleError::WalletNotConnected)
        ));
        assert!(matches!(
            builder.send_capsule(&wallet, send_params(1, vec![sender()])),
            Err(CapsuleError::WalletNotConnected)
        ));
        assert!(matches!(
            builder.claim_capsule(
                &wallet,
                ClaimCapsuleParams {
                    vault_id: ObjectId::from_u8(0x10),
                    capsule_id: ObjectId::from_u8(0x42),
                    clock_id: ObjectId::from_u8(6),
                }
            ),
            Err(CapsuleError::WalletNotConnected)
        ));
    }
}
