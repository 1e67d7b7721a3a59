#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Notify;

use wallet_confirm_core::{
    AccountInfo, AnalyticsEvent, AnalyticsPort, ChainId, ChainStatePort, ClockPort,
    ConfirmConfig, ConfirmationSession, DappSessionPort, DismissRequest, GasEstimatorPort,
    GasFeeParams, GasFeeTable, HistoryPort, HistoryRecord, NavigatorPort, PendingRequest,
    PortError, Ports, RequestMethod, RequestSource, SignerPort, SpeedTier, TransactionDraft,
    TransactionRequest, TransactionResult, WalletHandle,
};

pub const ETH: u128 = 1_000_000_000_000_000_000;
pub const GWEI: u64 = 1_000_000_000;

pub fn eth_milli(milli: u64) -> U256 {
    U256::from(milli) * U256::from(ETH / 1_000)
}

pub fn account() -> Address {
    "0x1000000000000000000000000000000000000001"
        .parse()
        .expect("valid account")
}

pub fn recipient() -> Address {
    "0x000000000000000000000000000000000000CAFE"
        .parse()
        .expect("valid recipient")
}

pub fn tx_hash() -> B256 {
    "0xabc0000000000000000000000000000000000000000000000000000000000001"
        .parse()
        .expect("valid hash")
}

/// Normal tier: 30 gwei max base + 2 gwei tip, 20 gwei current base.
pub fn fee_table(chain_id: ChainId) -> GasFeeTable {
    let mut by_speed = BTreeMap::new();
    by_speed.insert(
        SpeedTier::Normal,
        GasFeeParams::Eip1559 {
            max_base_fee: U256::from(30 * GWEI),
            max_priority_fee: U256::from(2 * GWEI),
        },
    );
    by_speed.insert(
        SpeedTier::Fast,
        GasFeeParams::Eip1559 {
            max_base_fee: U256::from(45 * GWEI),
            max_priority_fee: U256::from(3 * GWEI),
        },
    );
    GasFeeTable {
        chain_id,
        current_base_fee: Some(U256::from(20 * GWEI)),
        by_speed,
        l1_fee: None,
    }
}

/// Max fee of the normal tier for a plain transfer.
pub fn normal_transfer_max_fee() -> U256 {
    U256::from(21_000u64) * U256::from(32 * GWEI)
}

#[derive(Debug, Default)]
pub struct FakeGas {
    pub fee_calls: Mutex<Vec<ChainId>>,
    pub estimate: Mutex<Option<u64>>,
    pub estimate_calls: AtomicUsize,
    pub fail_fees: Mutex<bool>,
}

impl FakeGas {
    pub fn with_estimate(estimate: u64) -> Self {
        Self {
            estimate: Mutex::new(Some(estimate)),
            ..Self::default()
        }
    }

    pub fn fee_calls_for(&self, chain_id: ChainId) -> usize {
        self.fee_calls
            .lock()
            .expect("fee calls")
            .iter()
            .filter(|c| **c == chain_id)
            .count()
    }
}

#[async_trait]
impl GasEstimatorPort for FakeGas {
    async fn fee_table(&self, chain_id: ChainId) -> Result<GasFeeTable, PortError> {
        self.fee_calls.lock().expect("fee calls").push(chain_id);
        if *self.fail_fees.lock().expect("fail flag") {
            return Err(PortError::Transport("gas oracle offline".to_owned()));
        }
        Ok(fee_table(chain_id))
    }

    async fn estimate_gas(
        &self,
        _chain_id: ChainId,
        request: &TransactionRequest,
    ) -> Result<u64, PortError> {
        assert!(request.gas.is_none(), "dapp gas must be stripped");
        self.estimate_calls.fetch_add(1, Ordering::SeqCst);
        self.estimate
            .lock()
            .expect("estimate")
            .ok_or_else(|| PortError::Transport("estimate failed".to_owned()))
    }

    async fn block_gas_limit(&self, _chain_id: ChainId) -> Result<u64, PortError> {
        Ok(30_000_000)
    }
}

#[derive(Debug)]
pub struct FakeChain {
    pub balance: Mutex<U256>,
    pub pending_nonce: AtomicU64,
    pub code: Mutex<HashMap<Address, Bytes>>,
}

impl FakeChain {
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance: Mutex::new(balance),
            pending_nonce: AtomicU64::new(0),
            code: Mutex::new(HashMap::new()),
        }
    }

    pub fn deploy(&self, address: Address) {
        self.code
            .lock()
            .expect("code")
            .insert(address, Bytes::from_static(&[0x60, 0x80]));
    }
}

#[async_trait]
impl ChainStatePort for FakeChain {
    async fn native_balance(&self, _: Address, _: ChainId) -> Result<U256, PortError> {
        Ok(*self.balance.lock().expect("balance"))
    }

    async fn pending_nonce(&self, _: Address, _: ChainId) -> Result<u64, PortError> {
        Ok(self.pending_nonce.load(Ordering::SeqCst))
    }

    async fn code_at(&self, address: Address, _: ChainId) -> Result<Bytes, PortError> {
        Ok(self
            .code
            .lock()
            .expect("code")
            .get(&address)
            .cloned()
            .unwrap_or_default())
    }
}

/// Signer that records every call and can be held open or told to fail.
#[derive(Debug, Default)]
pub struct RecordingSigner {
    pub calls: AtomicUsize,
    pub loads: AtomicUsize,
    pub drafts: Mutex<Vec<TransactionDraft>>,
    pub failures: Mutex<Vec<PortError>>,
    pub hardware: bool,
    pub started: Notify,
    pub gate: Option<Notify>,
}

impl RecordingSigner {
    pub fn hardware() -> Self {
        Self {
            hardware: true,
            ..Self::default()
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::default()
        }
    }

    pub fn fail_next(&self, err: PortError) {
        self.failures.lock().expect("failures").push(err);
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    async fn enter(&self, draft: Option<&TransactionDraft>) -> Result<(), PortError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(draft) = draft {
            self.drafts.lock().expect("drafts").push(draft.clone());
        }
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        match self.failures.lock().expect("failures").pop() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SignerPort for RecordingSigner {
    async fn load_wallet(&self, address: Address) -> Result<WalletHandle, PortError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(WalletHandle {
            address,
            is_hardware_wallet: self.hardware,
            device_id: self.hardware.then(|| "ledger-test".to_owned()),
        })
    }

    async fn sign_message(
        &self,
        _wallet: &WalletHandle,
        _method: RequestMethod,
        _message: &Value,
    ) -> Result<String, PortError> {
        self.enter(None).await?;
        Ok("0x5151".to_owned())
    }

    async fn sign_transaction(
        &self,
        _wallet: &WalletHandle,
        draft: &TransactionDraft,
    ) -> Result<Bytes, PortError> {
        self.enter(Some(draft)).await?;
        Ok(Bytes::from_static(&[0x02, 0xf8]))
    }

    async fn send_transaction(
        &self,
        _wallet: &WalletHandle,
        draft: &TransactionDraft,
    ) -> Result<TransactionResult, PortError> {
        self.enter(Some(draft)).await?;
        Ok(TransactionResult {
            hash: tx_hash(),
            nonce: draft.nonce,
            from: draft.from,
            to: draft.to,
            value: draft.value,
            data: draft.data.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success { request_id: String, result: Value },
    Error { request_id: String, code: i64, message: String },
}

#[derive(Debug)]
pub struct RecordingSession {
    pub active: bool,
    pub responses: Mutex<Vec<Response>>,
}

impl RecordingSession {
    pub fn active() -> Self {
        Self {
            active: true,
            responses: Mutex::new(Vec::new()),
        }
    }

    pub fn gone() -> Self {
        Self {
            active: false,
            responses: Mutex::new(Vec::new()),
        }
    }

    pub fn responses(&self) -> Vec<Response> {
        self.responses.lock().expect("responses").clone()
    }
}

#[async_trait]
impl DappSessionPort for RecordingSession {
    async fn is_session_active(&self, _session_id: &str) -> Result<bool, PortError> {
        Ok(self.active)
    }

    async fn respond_success(&self, request_id: &str, result: Value) -> Result<(), PortError> {
        self.responses.lock().expect("responses").push(Response::Success {
            request_id: request_id.to_owned(),
            result,
        });
        Ok(())
    }

    async fn respond_error(
        &self,
        request_id: &str,
        code: i64,
        message: &str,
    ) -> Result<(), PortError> {
        self.responses.lock().expect("responses").push(Response::Error {
            request_id: request_id.to_owned(),
            code,
            message: message.to_owned(),
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryHistory {
    pub records: Mutex<Vec<HistoryRecord>>,
    pub latest: Mutex<Option<u64>>,
}

#[async_trait]
impl HistoryPort for MemoryHistory {
    async fn add_transaction(
        &self,
        _address: Address,
        _chain_id: ChainId,
        record: HistoryRecord,
    ) -> Result<(), PortError> {
        self.records.lock().expect("records").push(record);
        Ok(())
    }

    async fn latest_nonce(&self, _: Address, _: ChainId) -> Result<Option<u64>, PortError> {
        Ok(*self.latest.lock().expect("latest"))
    }
}

#[derive(Debug, Default)]
pub struct RecordingNavigator {
    pub dismissed: Mutex<Vec<DismissRequest>>,
}

impl RecordingNavigator {
    pub fn dismissed(&self) -> Vec<DismissRequest> {
        self.dismissed.lock().expect("dismissed").clone()
    }
}

#[async_trait]
impl NavigatorPort for RecordingNavigator {
    async fn dismiss(&self, request: DismissRequest) -> Result<(), PortError> {
        self.dismissed.lock().expect("dismissed").push(request);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    pub events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .expect("events")
            .iter()
            .map(AnalyticsEvent::name)
            .collect()
    }
}

impl AnalyticsPort for RecordingAnalytics {
    fn track(&self, event: AnalyticsEvent) {
        self.events.lock().expect("events").push(event);
    }
}

#[derive(Debug, Default)]
pub struct TestClock {
    now: AtomicU64,
}

impl ClockPort for TestClock {
    fn now_ms(&self) -> Result<u64, PortError> {
        Ok(self.now.fetch_add(1, Ordering::SeqCst) + 1_739_750_400_000)
    }
}

pub struct Harness {
    pub gas: Arc<FakeGas>,
    pub chain: Arc<FakeChain>,
    pub signer: Arc<RecordingSigner>,
    pub session: Arc<RecordingSession>,
    pub history: Arc<MemoryHistory>,
    pub navigator: Arc<RecordingNavigator>,
    pub analytics: Arc<RecordingAnalytics>,
}

impl Harness {
    pub fn new(balance: U256) -> Self {
        Self::with_signer(balance, RecordingSigner::default())
    }

    pub fn with_signer(balance: U256, signer: RecordingSigner) -> Self {
        Self {
            gas: Arc::new(FakeGas::with_estimate(21_000)),
            chain: Arc::new(FakeChain::with_balance(balance)),
            signer: Arc::new(signer),
            session: Arc::new(RecordingSession::active()),
            history: Arc::new(MemoryHistory::default()),
            navigator: Arc::new(RecordingNavigator::default()),
            analytics: Arc::new(RecordingAnalytics::default()),
        }
    }

    pub fn ports(&self) -> Ports {
        Ports {
            gas: self.gas.clone(),
            chain: self.chain.clone(),
            signer: self.signer.clone(),
            session: self.session.clone(),
            history: self.history.clone(),
            navigator: self.navigator.clone(),
            analytics: self.analytics.clone(),
            clock: Arc::new(TestClock::default()),
        }
    }

    pub fn open(&self, request: PendingRequest) -> ConfirmationSession {
        let account = AccountInfo {
            address: request.address,
            label: Some("Main".to_owned()),
            is_hardware_wallet: self.signer.hardware,
        };
        ConfirmationSession::open(request, account, self.ports(), ConfirmConfig::default())
    }
}

fn request(method: RequestMethod, chain_id: ChainId, params: Vec<Value>) -> PendingRequest {
    PendingRequest {
        request_id: "req-1".to_owned(),
        session_id: "topic-1".to_owned(),
        method,
        params,
        chain_id,
        address: account(),
        dapp_name: "Example dApp".to_owned(),
        dapp_url: "https://dapp.example/app".to_owned(),
        image_url: Some("https://dapp.example/icon.png".to_owned()),
        source: RequestSource::WalletConnect,
    }
}

/// `eth_sendTransaction` of `value` wei to a plain account.
pub fn send_request(chain_id: ChainId, value: U256) -> PendingRequest {
    request(
        RequestMethod::SendTransaction,
        chain_id,
        vec![json!({
            "from": account().to_string(),
            "to": recipient().to_string(),
            "value": format!("{value:#x}"),
            "data": "0x",
        })],
    )
}

pub fn contract_call(method: RequestMethod, to: Address, gas: Option<u64>) -> PendingRequest {
    let mut payload = json!({
        "from": account().to_string(),
        "to": to.to_string(),
        "value": "0x0",
        "data": "0xa9059cbb",
    });
    if let Some(gas) = gas {
        payload["gas"] = Value::String(format!("{gas:#x}"));
    }
    request(method, 1, vec![payload])
}

pub fn personal_sign_request() -> PendingRequest {
    request(
        RequestMethod::PersonalSign,
        1,
        vec![
            Value::String("0x68656c6c6f".to_owned()),
            Value::String(account().to_string()),
        ],
    )
}
