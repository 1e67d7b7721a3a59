use alloy::primitives::{Address, Bytes, U256};
use async_trait::async_trait;
use serde_json::json;

use wallet_confirm_core::{ChainId, ChainStatePort, PortError};

use crate::rpc::RpcClient;

#[derive(Debug, Clone)]
pub struct RpcChainState {
    rpc: RpcClient,
}

impl RpcChainState {
    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl ChainStatePort for RpcChainState {
    async fn native_balance(&self, address: Address, chain_id: ChainId) -> Result<U256, PortError> {
        self.rpc
            .call(chain_id, "eth_getBalance", json!([address, "latest"]))
            .await
    }

    async fn pending_nonce(&self, address: Address, chain_id: ChainId) -> Result<u64, PortError> {
        self.rpc
            .call_u64(chain_id, "eth_getTransactionCount", json!([address, "pending"]))
            .await
    }

    async fn code_at(&self, address: Address, chain_id: ChainId) -> Result<Bytes, PortError> {
        self.rpc
            .call(chain_id, "eth_getCode", json!([address, "latest"]))
            .await
    }
}
