use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{
    AnalyticsEvent, ChainId, DismissRequest, GasFeeTable, HistoryRecord, RequestMethod,
    TransactionDraft, TransactionRequest, TransactionResult, WalletHandle,
};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

#[async_trait]
pub trait GasEstimatorPort: Send + Sync {
    async fn fee_table(&self, chain_id: ChainId) -> Result<GasFeeTable, PortError>;
    async fn estimate_gas(
        &self,
        chain_id: ChainId,
        request: &TransactionRequest,
    ) -> Result<u64, PortError>;
    async fn block_gas_limit(&self, chain_id: ChainId) -> Result<u64, PortError>;
}

#[async_trait]
pub trait ChainStatePort: Send + Sync {
    async fn native_balance(&self, address: Address, chain_id: ChainId)
        -> Result<U256, PortError>;
    async fn pending_nonce(&self, address: Address, chain_id: ChainId) -> Result<u64, PortError>;
    async fn code_at(&self, address: Address, chain_id: ChainId) -> Result<Bytes, PortError>;
}

#[async_trait]
pub trait SignerPort: Send + Sync {
    /// Unlocks key material for `address`. Called once per confirmation attempt.
    async fn load_wallet(&self, address: Address) -> Result<WalletHandle, PortError>;
    async fn sign_message(
        &self,
        wallet: &WalletHandle,
        method: RequestMethod,
        message: &Value,
    ) -> Result<String, PortError>;
    /// Returns the raw signed transaction without broadcasting it.
    async fn sign_transaction(
        &self,
        wallet: &WalletHandle,
        draft: &TransactionDraft,
    ) -> Result<Bytes, PortError>;
    async fn send_transaction(
        &self,
        wallet: &WalletHandle,
        draft: &TransactionDraft,
    ) -> Result<TransactionResult, PortError>;
}

#[async_trait]
pub trait DappSessionPort: Send + Sync {
    async fn is_session_active(&self, session_id: &str) -> Result<bool, PortError>;
    async fn respond_success(&self, request_id: &str, result: Value) -> Result<(), PortError>;
    async fn respond_error(
        &self,
        request_id: &str,
        code: i64,
        message: &str,
    ) -> Result<(), PortError>;
}

#[async_trait]
pub trait HistoryPort: Send + Sync {
    async fn add_transaction(
        &self,
        address: Address,
        chain_id: ChainId,
        record: HistoryRecord,
    ) -> Result<(), PortError>;
    async fn latest_nonce(
        &self,
        address: Address,
        chain_id: ChainId,
    ) -> Result<Option<u64>, PortError>;
}

#[async_trait]
pub trait NavigatorPort: Send + Sync {
    async fn dismiss(&self, request: DismissRequest) -> Result<(), PortError>;
}

/// Fire-and-forget; implementations must not fail the caller.
pub trait AnalyticsPort: Send + Sync {
    fn track(&self, event: AnalyticsEvent);
}

pub trait ClockPort: Send + Sync {
    fn now_ms(&self) -> Result<u64, PortError>;
}

/// Collaborators a confirmation session talks to.
#[derive(Clone)]
pub struct Ports {
    pub gas: Arc<dyn GasEstimatorPort>,
    pub chain: Arc<dyn ChainStatePort>,
    pub signer: Arc<dyn SignerPort>,
    pub session: Arc<dyn DappSessionPort>,
    pub history: Arc<dyn HistoryPort>,
    pub navigator: Arc<dyn NavigatorPort>,
    pub analytics: Arc<dyn AnalyticsPort>,
    pub clock: Arc<dyn ClockPort>,
}
