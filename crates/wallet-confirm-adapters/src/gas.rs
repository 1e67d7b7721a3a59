use std::collections::BTreeMap;

use alloy::consensus::{SignableTransaction, TxLegacy};
use alloy::dyn_abi::{DynSolValue, JsonAbiExt};
use alloy::json_abi::Function;
use alloy::primitives::{address, Address, Bytes, TxKind, U256};
use async_trait::async_trait;
use serde_json::{json, Value};

use wallet_confirm_core::chains::charges_l1_fee;
use wallet_confirm_core::domain::gas_to_u64;
use wallet_confirm_core::gas::BASIC_TX_GAS;
use wallet_confirm_core::{
    ChainId, GasEstimatorPort, GasFeeParams, GasFeeTable, PortError, SpeedTier, TransactionRequest,
};

use crate::config::{FeeTierConfig, TierMultipliers};
use crate::rpc::{quantity_field, strip_nulls, RpcClient};

/// Fee tiers derived from the latest block's base fee and the node's tip
/// suggestion, or from `eth_gasPrice` on chains without EIP-1559.
#[derive(Debug, Clone)]
pub struct RpcGasEstimator {
    rpc: RpcClient,
    tiers: FeeTierConfig,
}

impl RpcGasEstimator {
    pub fn new(rpc: RpcClient, tiers: FeeTierConfig) -> Self {
        Self { rpc, tiers }
    }

    async fn latest_block(&self, chain_id: ChainId) -> Result<Value, PortError> {
        let block: Value = self
            .rpc
            .call(chain_id, "eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        if block.is_null() {
            return Err(PortError::NotFound(format!("no latest block on chain {chain_id}")));
        }
        Ok(block)
    }

    async fn priority_fee(&self, chain_id: ChainId) -> U256 {
        match self
            .rpc
            .call::<U256>(chain_id, "eth_maxPriorityFeePerGas", json!([]))
            .await
        {
            Ok(tip) => tip,
            Err(err) => {
                tracing::warn!(chain_id, error = %err, "no tip suggestion, using fallback");
                U256::from(self.tiers.fallback_priority_fee_wei)
            }
        }
    }

    /// L1 data fee of a basic transfer on OP-stack chains. Failures leave it unset.
    async fn l1_fee(&self, chain_id: ChainId, gas_price: U256) -> Option<U256> {
        let calldata = match l1_fee_calldata(chain_id, gas_price) {
            Ok(calldata) => calldata,
            Err(err) => {
                tracing::warn!(chain_id, error = %err, "cannot build l1 fee query");
                return None;
            }
        };
        let call = json!([{ "to": GAS_PRICE_ORACLE, "data": calldata }, "latest"]);
        match self.rpc.call::<Bytes>(chain_id, "eth_call", call).await {
            Ok(output) => U256::try_from_be_slice(&output),
            Err(err) => {
                tracing::warn!(chain_id, error = %err, "l1 fee lookup failed");
                None
            }
        }
    }

    fn tiers(&self) -> [(SpeedTier, TierMultipliers); 3] {
        [
            (SpeedTier::Normal, self.tiers.normal),
            (SpeedTier::Fast, self.tiers.fast),
            (SpeedTier::Urgent, self.tiers.urgent),
        ]
    }
}

/// OP-stack `GasPriceOracle` predeploy.
pub const GAS_PRICE_ORACLE: Address = address!("420000000000000000000000000000000000000F");

/// `getL1Fee(bytes)` calldata for an unsigned basic transfer priced at `gas_price`.
fn l1_fee_calldata(chain_id: ChainId, gas_price: U256) -> Result<Bytes, PortError> {
    let tx = TxLegacy {
        chain_id: Some(chain_id),
        gas_price: u128::try_from(gas_price).unwrap_or(u128::MAX),
        gas_limit: BASIC_TX_GAS,
        to: TxKind::Call(Address::ZERO),
        ..Default::default()
    };
    let function = Function::parse("function getL1Fee(bytes _data) view returns (uint256)")
        .map_err(|e| PortError::Validation(format!("invalid oracle signature: {e}")))?;
    let encoded = function
        .abi_encode_input(&[DynSolValue::Bytes(tx.encoded_for_signing())])
        .map_err(|e| PortError::Validation(format!("abi encoding failed: {e}")))?;
    Ok(Bytes::from(encoded))
}

fn scale(value: U256, bps: u64) -> U256 {
    value.saturating_mul(U256::from(bps)) / U256::from(10_000u64)
}

#[async_trait]
impl GasEstimatorPort for RpcGasEstimator {
    async fn fee_table(&self, chain_id: ChainId) -> Result<GasFeeTable, PortError> {
        let block = self.latest_block(chain_id).await?;
        let base_fee = quantity_field(&block, "baseFeePerGas")?;

        let by_speed: BTreeMap<SpeedTier, GasFeeParams> = match base_fee {
            Some(base_fee) => {
                let tip = self.priority_fee(chain_id).await;
                self.tiers()
                    .into_iter()
                    .map(|(tier, m)| {
                        (
                            tier,
                            GasFeeParams::Eip1559 {
                                max_base_fee: scale(base_fee, m.base_fee_bps),
                                max_priority_fee: scale(tip, m.priority_fee_bps),
                            },
                        )
                    })
                    .collect()
            }
            None => {
                let gas_price: U256 = self.rpc.call(chain_id, "eth_gasPrice", json!([])).await?;
                self.tiers()
                    .into_iter()
                    .map(|(tier, m)| {
                        (
                            tier,
                            GasFeeParams::Legacy {
                                gas_price: scale(gas_price, m.gas_price_bps),
                            },
                        )
                    })
                    .collect()
            }
        };
        let l1_fee = match by_speed.get(&SpeedTier::Normal) {
            Some(normal) if charges_l1_fee(chain_id) => {
                self.l1_fee(chain_id, normal.max_price_per_gas()).await
            }
            _ => None,
        };
        tracing::debug!(
            chain_id,
            eip1559 = base_fee.is_some(),
            l1_fee = ?l1_fee,
            "fee table refreshed"
        );

        Ok(GasFeeTable {
            chain_id,
            current_base_fee: base_fee,
            by_speed,
            l1_fee,
        })
    }

    async fn estimate_gas(
        &self,
        chain_id: ChainId,
        request: &TransactionRequest,
    ) -> Result<u64, PortError> {
        let params = serde_json::to_value(request)
            .map_err(|e| PortError::Validation(format!("unencodable transaction request: {e}")))?;
        self.rpc
            .call_u64(chain_id, "eth_estimateGas", json!([strip_nulls(params)]))
            .await
    }

    async fn block_gas_limit(&self, chain_id: ChainId) -> Result<u64, PortError> {
        let block = self.latest_block(chain_id).await?;
        quantity_field(&block, "gasLimit")?
            .map(gas_to_u64)
            .ok_or_else(|| PortError::Validation("latest block has no gasLimit".to_owned()))
    }
}
