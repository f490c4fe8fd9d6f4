//! Capsule list state: filtering, refresh and the claim action

use crate::{
    decoder::{decode_all, now_ms},
    executor::TransactionExecutor,
    forms::SendCapsuleForm,
    registry::RegistryReader,
    rpc::SuiRpc,
    transaction::builder::{
        ClaimCapsuleParams, CoinSource, DepositParams, PreparedTransaction, TransactionBuilder,
    },
    types::{Capsule, CapsuleStatus, ObjectId, TransactionResult},
    wallet::WalletContext,
    CapsuleError, Config, Result,
};
use chrono::Utc;
use std::fmt;
use std::str::FromStr;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

// ================================
// Filtering
// ================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CapsuleFilter {
    #[default]
    All,
    Locked,
    Unlockable,
    Claimed,
}

impl CapsuleFilter {
    pub fn matches(self, capsule: &Capsule) -> bool {
        match self {
            CapsuleFilter::All => true,
            CapsuleFilter::Locked => capsule.status == CapsuleStatus::Locked,
            CapsuleFilter::Unlockable => capsule.status == CapsuleStatus::Unlockable,
            CapsuleFilter::Claimed => capsule.status == CapsuleStatus::Claimed,
        }
    }
}

impl FromStr for CapsuleFilter {
    type Err = CapsuleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(CapsuleFilter::All),
            "locked" => Ok(CapsuleFilter::Locked),
            "unlockable" => Ok(CapsuleFilter::Unlockable),
            "claimed" => Ok(CapsuleFilter::Claimed),
            other => Err(CapsuleError::InvalidInput(format!("unknown filter {other:?}"))),
        }
    }
}

impl fmt::Display for CapsuleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapsuleFilter::All => write!(f, "all"),
            CapsuleFilter::Locked => write!(f, "locked"),
            CapsuleFilter::Unlockable => write!(f, "unlockable"),
            CapsuleFilter::Claimed => write!(f, "claimed"),
        }
    }
}

pub fn filter_capsules(capsules: &[Capsule], filter: CapsuleFilter) -> Vec<&Capsule> {
    capsules.iter().filter(|c| filter.matches(c)).collect()
}

// ================================
// Submission Guard
// ================================

/// Held while a write is in flight; released on drop
pub struct SubmitGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SubmitGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| CapsuleError::SubmissionInFlight)?;
        Ok(Self { flag })
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ================================
// Board
// ================================

/// Snapshot shown to the user
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    pub capsules: Vec<Capsule>,
    pub loading: bool,
    pub error: Option<String>,
    pub last_transaction: Option<TransactionResult>,
}

/// Capsule list backed by the registry
pub struct CapsuleBoard {
    config: Config,
    reader: RegistryReader,
    builder: TransactionBuilder,
    executor: TransactionExecutor,
    state: RwLock<BoardState>,
    attached: AtomicBool,
    submitting: AtomicBool,
    reads_in_flight: AtomicUsize,
}

impl CapsuleBoard {
    pub fn new(rpc: Arc<dyn SuiRpc>, config: Config) -> Self {
        Self {
            reader: RegistryReader::new(rpc.clone()),
            builder: TransactionBuilder::from_config(&config),
            executor: TransactionExecutor::new(rpc, &config),
            config,
            state: RwLock::new(BoardState::default()),
            attached: AtomicBool::new(true),
            submitting: AtomicBool::new(false),
            reads_in_flight: AtomicUsize::new(0),
        }
    }

    pub async fn state(&self) -> BoardState {
        self.state.read().await.clone()
    }

    /// Current list restricted to `filter`
    pub async fn filtered(&self, filter: CapsuleFilter) -> Vec<Capsule> {
        let state = self.state.read().await;
        filter_capsules(&state.capsules, filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Stop applying results; reads still in flight are discarded
    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Re-read the registry. Overlapping refreshes are allowed; the last
    /// one to finish wins and `loading` holds until all of them finish.
    pub async fn refresh(&self) -> Result<()> {
        if !self.is_attached() {
            return Ok(());
        }
        {
            let mut state = self.state.write().await;
            self.reads_in_flight.fetch_add(1, Ordering::AcqRel);
            state.loading = true;
            state.error = None;
        }

        let fetched = self.reader.fetch_capsules(self.config.registry_id).await;

        let mut state = self.state.write().await;
        let remaining = self
            .reads_in_flight
            .fetch_sub(1, Ordering::AcqRel)
            .saturating_sub(1);
        state.loading = remaining > 0;

        if !self.is_attached() {
            debug!("Board detached, dropping registry read");
            return Ok(());
        }

        match fetched {
            Ok(records) => {
                state.capsules = decode_all(&records, now_ms());
                info!("Board holds {} capsules", state.capsules.len());
                Ok(())
            }
            Err(e) => {
                warn!("Failed to fetch capsules: {}", e);
                state.capsules.clear();
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Reserve the single write slot
    pub fn begin_submission(&self) -> Result<SubmitGuard<'_>> {
        SubmitGuard::acquire(&self.submitting)
    }

    /// Claim a capsule, then refresh on success
    pub async fn claim(&self, wallet: &WalletContext, capsule_id: ObjectId) -> Result<TransactionResult> {
        let params = ClaimCapsuleParams {
            vault_id: self.config.vault_id,
            capsule_id,
            clock_id: self.config.clock_id,
        };
        self.submit(wallet, |builder| builder.claim_capsule(wallet, params))
            .await
    }

    /// Create a capsule from form input, then refresh on success
    pub async fn send(
        &self,
        wallet: &WalletContext,
        form: SendCapsuleForm,
        coin: CoinSource,
    ) -> Result<TransactionResult> {
        let config = &self.config;
        self.submit(wallet, |builder| {
            let sender = wallet.address().ok_or(CapsuleError::WalletNotConnected)?;
            let params = form.into_params(Utc::now(), sender, config, coin)?;
            builder.send_capsule(wallet, params)
        })
        .await
    }

    /// Top up the vault
    pub async fn deposit(
        &self,
        wallet: &WalletContext,
        coin: CoinSource,
        amount: &str,
    ) -> Result<TransactionResult> {
        let params = DepositParams {
            vault_id: self.config.vault_id,
            coin,
            amount: amount.to_string(),
        };
        self.submit(wallet, |builder| builder.deposit(wallet, params))
            .await
    }

    async fn submit<F>(&self, wallet: &WalletContext, build: F) -> Result<TransactionResult>
    where
        F: FnOnce(&TransactionBuilder) -> Result<PreparedTransaction>,
    {
        let _guard = self.begin_submission()?;

        let prepared = match build(&self.builder) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.state.write().await.error = Some(e.to_string());
                return Err(e);
            }
        };

        let result = self.executor.execute(wallet, prepared).await;
        {
            let mut state = self.state.write().await;
            state.error = result.error.clone();
            state.last_transaction = Some(result.clone());
        }

        if result.success {
            // A failed refresh is already recorded on the board
            let _ = self.refresh().await;
        }
        result.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        forms::Visibility,
        rpc::{
            MockSuiRpc, ObjectDataOptions, ObjectResponse, ObjectsPage, OwnedObjectsQuery,
            TransactionBlockResponse,
        },
        types::SuiAddress,
        wallet::{MockWalletSigner, SignedTransaction},
    };
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    fn capsule_object(id: &str, unlock_ms: u64, claimed: u64) -> ObjectResponse {
        serde_json::from_value(json!({
            "data": {
                "objectId": id,
                "content": {
                    "dataType": "moveObject",
                    "type": "0xabc::cofuture::Capsule",
                    "fields": {
                        "creator": "0xa",
                        "encrypted_content": "0x6869",
                        "unlock_timestamp_ms": unlock_ms.to_string(),
                        "audience": ["0xa", "0xb"],
                        "total_reward": "200",
                        "reward_per_user": "100",
                        "max_claim": "2",
                        "claimed_count": claimed.to_string()
                    }
                }
            }
        }))
        .unwrap()
    }

    fn registry_with(ids: &[&str]) -> ObjectResponse {
        serde_json::from_value(json!({
            "data": {
                "objectId": "0x99",
                "content": {
                    "dataType": "moveObject",
                    "type": "0xabc::cofuture::CapsuleRegistry",
                    "fields": { "capsules": ids }
                }
            }
        }))
        .unwrap()
    }

    fn registry_object() -> ObjectResponse {
        registry_with(&["0x1", "0x2", "0x3"])
    }

    /// Registry reads that suspend for a set time; the n-th read uses the
    /// n-th `(delay_ms, member ids)` entry
    struct DelayedRpc {
        reads: Mutex<VecDeque<(u64, Vec<&'static str>)>>,
    }

    impl DelayedRpc {
        fn new(reads: Vec<(u64, Vec<&'static str>)>) -> Arc<Self> {
            Arc::new(Self {
                reads: Mutex::new(reads.into()),
            })
        }
    }

    #[async_trait::async_trait]
    impl SuiRpc for DelayedRpc {
        async fn get_object(&self, _id: ObjectId, _options: ObjectDataOptions) -> Result<ObjectResponse> {
            let next = self.reads.lock().unwrap().pop_front();
            let (delay_ms, ids) = next.unwrap_or((0, Vec::new()));
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Ok(registry_with(&ids))
        }

        async fn multi_get_objects(
            &self,
            ids: Vec<ObjectId>,
            _options: ObjectDataOptions,
        ) -> Result<Vec<ObjectResponse>> {
            Ok(ids
                .iter()
                .map(|id| capsule_object(&id.to_hex_literal(), 0, 0))
                .collect())
        }

        async fn get_owned_objects(
            &self,
            _owner: SuiAddress,
            _query: OwnedObjectsQuery,
            _cursor: Option<ObjectId>,
        ) -> Result<ObjectsPage> {
            Ok(ObjectsPage::default())
        }

        async fn execute_transaction_block(
            &self,
            _signed: SignedTransaction,
        ) -> Result<TransactionBlockResponse> {
            Err(CapsuleError::RemoteExecutionFailure("not submitted in these tests".to_string()))
        }
    }

    fn reading_rpc() -> MockSuiRpc {
        let mut rpc = MockSuiRpc::new();
        rpc.expect_get_object().returning(|_, _| Ok(registry_object()));
        rpc.expect_multi_get_objects().returning(|_, _| {
            Ok(vec![
                capsule_object("0x1", u64::MAX, 0),
                capsule_object("0x2", 0, 0),
                capsule_object("0x3", 0, 2),
            ])
        });
        rpc
    }

    fn wallet() -> WalletContext {
        let mut signer = MockWalletSigner::new();
        signer.expect_address().return_const(ObjectId::from_u8(0xa));
        signer
            .expect_sign_transaction()
            .returning(|_| Ok(SignedTransaction::from_raw(&[1], &[vec![2]])));
        WalletContext::connected(Arc::new(signer))
    }

    #[test]
    fn test_filter_parse_and_display() {
        for filter in ["all", "locked", "unlockable", "claimed"] {
            assert_eq!(filter.parse::<CapsuleFilter>().unwrap().to_string(), filter);
        }
        assert!("pending".parse::<CapsuleFilter>().is_err());
    }

    #[tokio::test]
    async fn test_refresh_and_filter() {
        let board = CapsuleBoard::new(Arc::new(reading_rpc()), Config::default());
        board.refresh().await.unwrap();

        let state = board.state().await;
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.capsules.len(), 3);
        assert_eq!(state.capsules[0].message, "hi");

        let locked = board.filtered(CapsuleFilter::Locked).await;
        assert_eq!(locked.len(), 1);
        assert_eq!(locked[0].id, ObjectId::from_u8(1));
        assert_eq!(board.filtered(CapsuleFilter::Unlockable).await[0].id, ObjectId::from_u8(2));
        assert_eq!(board.filtered(CapsuleFilter::Claimed).await[0].id, ObjectId::from_u8(3));
        assert_eq!(board.filtered(CapsuleFilter::All).await.len(), 3);
    }

    #[tokio::test]
    async fn test_registry_failure_sets_error_and_clears_loading() {
        let mut rpc = MockSuiRpc::new();
        rpc.expect_get_object()
            .returning(|_, _| Ok(ObjectResponse::default()));

        let board = CapsuleBoard::new(Arc::new(rpc), Config::default());
        assert!(board.refresh().await.is_err());

        let state = board.state().await;
        assert!(!state.loading);
        assert!(state.capsules.is_empty());
        assert!(state.error.unwrap().contains("Invalid registry"));
    }

    #[tokio::test]
    async fn test_detached_board_discards_reads() {
        let board = CapsuleBoard::new(Arc::new(MockSuiRpc::new()), Config::default());
        board.detach();
        board.refresh().await.unwrap();
        assert!(board.state().await.capsules.is_empty());
    }

    #[tokio::test]
    async fn test_second_submission_is_rejected_while_in_flight() {
        let mut rpc = MockSuiRpc::new();
        rpc.expect_execute_transaction_block().never();
        let board = CapsuleBoard::new(Arc::new(rpc), Config::default());

        let guard = board.begin_submission().unwrap();
        let err = board
            .claim(&wallet(), ObjectId::from_u8(2))
            .await
            .unwrap_err();
        assert!(matches!(err, CapsuleError::SubmissionInFlight));

        drop(guard);
        assert!(board.begin_submission().is_ok());
    }

    #[tokio::test]
    async fn test_claim_without_wallet_makes_no_calls() {
        let board = CapsuleBoard::new(Arc::new(MockSuiRpc::new()), Config::default());
        let err = board
            .claim(&WalletContext::disconnected(), ObjectId::from_u8(2))
            .await
            .unwrap_err();

        assert!(matches!(err, CapsuleError::WalletNotConnected));
        assert!(board.state().await.error.is_some());
    }

    #[tokio::test]
    async fn test_send_with_past_unlock_makes_no_calls() {
        let mut signer = MockWalletSigner::new();
        signer.expect_address().return_const(ObjectId::from_u8(0xa));
        signer.expect_sign_transaction().never();
        let wallet = WalletContext::connected(Arc::new(signer));

        let board = CapsuleBoard::new(Arc::new(MockSuiRpc::new()), Config::default());
        let form = SendCapsuleForm {
            message: "too late".to_string(),
            unlock_at: Utc::now() - chrono::Duration::minutes(1),
            visibility: Visibility::Private,
            token_amount: None,
        };

        let err = board.send(&wallet, form, CoinSource::Gas).await.unwrap_err();
        assert!(matches!(err, CapsuleError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_successful_claim_refreshes() {
        let mut rpc = reading_rpc();
        rpc.expect_execute_transaction_block().times(1).returning(|_| {
            Ok(serde_json::from_value::<TransactionBlockResponse>(json!({
                "digest": "Hx1",
                "effects": { "status": { "status": "success" } },
                "objectChanges": []
            }))
            .unwrap())
        });

        let board = CapsuleBoard::new(Arc::new(rpc), Config::default());
        let result = board.claim(&wallet(), ObjectId::from_u8(2)).await.unwrap();

        assert_eq!(result.digest.as_deref(), Some("Hx1"));
        let state = board.state().await;
        assert_eq!(state.capsules.len(), 3);
        assert_eq!(state.last_transaction, Some(result));
    }

    #[tokio::test]
    async fn test_detach_during_read_drops_late_result() {
        let rpc = DelayedRpc::new(vec![(100, vec!["0x1", "0x2"])]);
        let board = CapsuleBoard::new(rpc, Config::default());

        let (result, ()) = tokio::join!(board.refresh(), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(board.state().await.loading);
            board.detach();
        });

        result.unwrap();
        let state = board.state().await;
        assert!(state.capsules.is_empty());
        assert!(state.error.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_overlapping_refreshes_last_to_finish_wins() {
        let rpc = DelayedRpc::new(vec![(150, vec!["0x1", "0x2", "0x3"]), (10, vec!["0x1"])]);
        let board = CapsuleBoard::new(rpc, Config::default());

        let (slow, fast) = tokio::join!(board.refresh(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let fast = board.refresh().await;

            // The slow read is still pending
            let state = board.state().await;
            assert_eq!(state.capsules.len(), 1);
            assert!(state.loading);
            fast
        });

        slow.unwrap();
        fast.unwrap();
        let state = board.state().await;
        assert_eq!(state.capsules.len(), 3);
        assert!(!state.loading);
    }
}
