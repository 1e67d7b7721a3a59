use std::collections::BTreeMap;

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::PortError;

pub type ChainId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimestampMs(pub u64);

/// JSON-RPC methods a dApp may ask the wallet to confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestMethod {
    #[serde(rename = "eth_sendTransaction")]
    SendTransaction,
    #[serde(rename = "eth_signTransaction")]
    SignTransaction,
    #[serde(rename = "personal_sign")]
    PersonalSign,
    #[serde(rename = "eth_signTypedData")]
    SignTypedData,
    #[serde(rename = "eth_signTypedData_v4")]
    SignTypedDataV4,
}

impl RequestMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SendTransaction => "eth_sendTransaction",
            Self::SignTransaction => "eth_signTransaction",
            Self::PersonalSign => "personal_sign",
            Self::SignTypedData => "eth_signTypedData",
            Self::SignTypedDataV4 => "eth_signTypedData_v4",
        }
    }

    /// Message requests never move value on-chain.
    pub fn is_message(self) -> bool {
        matches!(
            self,
            Self::PersonalSign | Self::SignTypedData | Self::SignTypedDataV4
        )
    }

    pub fn is_send(self) -> bool {
        self == Self::SendTransaction
    }

    pub fn request_type(self) -> RequestType {
        if self.is_send() {
            RequestType::Transaction
        } else {
            RequestType::Signature
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Transaction,
    Signature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestSource {
    WalletConnect,
    Browser,
}

/// A dApp request waiting for the user's decision. Consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub request_id: String,
    pub session_id: String,
    pub method: RequestMethod,
    pub params: Vec<Value>,
    pub chain_id: ChainId,
    pub address: Address,
    pub dapp_name: String,
    pub dapp_url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub source: RequestSource,
}

impl PendingRequest {
    pub fn is_message_request(&self) -> bool {
        self.method.is_message()
    }

    /// Typed view of `params[0]` for transaction methods.
    pub fn transaction_request(&self) -> Result<TransactionRequest, PortError> {
        if self.is_message_request() {
            return Err(PortError::Validation(format!(
                "{} carries no transaction payload",
                self.method.as_str()
            )));
        }
        let raw = self
            .params
            .first()
            .ok_or_else(|| PortError::Validation("missing transaction params".to_owned()))?;
        serde_json::from_value(raw.clone())
            .map_err(|e| PortError::Validation(format!("invalid transaction params: {e}")))
    }

    /// The message to sign: the first param that is not the signer's address.
    pub fn message_param(&self) -> Result<&Value, PortError> {
        self.params
            .iter()
            .find(|p| !is_address_value(p))
            .ok_or_else(|| PortError::Validation("missing message param".to_owned()))
    }

    /// Host part of the dApp URL, or the raw URL when it does not parse.
    pub fn dapp_host(&self) -> &str {
        let rest = self
            .dapp_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.dapp_url);
        let host = rest.split(['/', '?', '#']).next().unwrap_or(rest);
        if host.is_empty() {
            &self.dapp_url
        } else {
            host
        }
    }
}

fn is_address_value(value: &Value) -> bool {
    value
        .as_str()
        .map(|s| s.len() == 42 && s.parse::<Address>().is_ok())
        .unwrap_or(false)
}

/// Transaction fields a dApp sends with `eth_sendTransaction`/`eth_signTransaction`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    #[serde(default)]
    pub from: Option<Address>,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(default)]
    pub value: Option<U256>,
    #[serde(default)]
    pub data: Option<Bytes>,
    #[serde(default)]
    pub gas: Option<U256>,
    #[serde(default)]
    pub gas_limit: Option<U256>,
    #[serde(default)]
    pub gas_price: Option<U256>,
    #[serde(default)]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default)]
    pub max_priority_fee_per_gas: Option<U256>,
}

impl TransactionRequest {
    pub fn value_or_zero(&self) -> U256 {
        self.value.unwrap_or(U256::ZERO)
    }

    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }

    pub fn dapp_gas(&self) -> Option<u64> {
        self.gas.map(gas_to_u64)
    }

    pub fn dapp_gas_limit(&self) -> Option<u64> {
        self.gas_limit.map(gas_to_u64)
    }

    /// Copy with every dApp-suggested gas and fee field removed.
    pub fn for_estimation(&self) -> Self {
        Self {
            gas: None,
            gas_limit: None,
            gas_price: None,
            max_fee_per_gas: None,
            max_priority_fee_per_gas: None,
            ..self.clone()
        }
    }
}

pub fn gas_to_u64(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeedTier {
    Normal,
    Fast,
    Urgent,
    Custom,
}

/// Per-gas pricing, in wei.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GasFeeParams {
    Eip1559 {
        max_base_fee: U256,
        max_priority_fee: U256,
    },
    Legacy {
        gas_price: U256,
    },
}

impl GasFeeParams {
    /// Highest price per gas the signer may pay.
    pub fn max_price_per_gas(&self) -> U256 {
        match self {
            Self::Eip1559 {
                max_base_fee,
                max_priority_fee,
            } => max_base_fee.saturating_add(*max_priority_fee),
            Self::Legacy { gas_price } => *gas_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasFeeTable {
    pub chain_id: ChainId,
    #[serde(default)]
    pub current_base_fee: Option<U256>,
    pub by_speed: BTreeMap<SpeedTier, GasFeeParams>,
    /// Extra L1 data fee charged by OP-stack rollups.
    #[serde(default)]
    pub l1_fee: Option<U256>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasFeeSelection {
    pub speed_tier: SpeedTier,
    pub params: GasFeeParams,
    pub gas_limit: u64,
    pub estimated_fee: U256,
    pub max_fee: U256,
}

/// Fully parameterized transaction, built right before signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDraft {
    pub chain_id: ChainId,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_params: GasFeeParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub hash: B256,
    pub nonce: u64,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub hash: B256,
    pub chain_id: ChainId,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_params: GasFeeParams,
    pub status: HistoryStatus,
    pub dapp_name: String,
    pub dapp_icon: Option<String>,
    pub added_at_ms: TimestampMs,
}

/// Result of a successful approval, as handed back to the requester.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    Sent(TransactionResult),
    SignedTransaction(Bytes),
    SignedMessage(String),
}

impl Approval {
    pub fn rpc_result(&self) -> Value {
        match self {
            Self::Sent(tx) => Value::String(tx.hash.to_string()),
            Self::SignedTransaction(raw) => Value::String(raw.to_string()),
            Self::SignedMessage(sig) => Value::String(sig.clone()),
        }
    }
}

/// Account the request targets, as known to the wallet repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    pub address: Address,
    pub label: Option<String>,
    pub is_hardware_wallet: bool,
}

impl AccountInfo {
    pub fn software(address: Address) -> Self {
        Self {
            address,
            label: None,
            is_hardware_wallet: false,
        }
    }
}

/// Key material unlocked for one confirmation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletHandle {
    pub address: Address,
    pub is_hardware_wallet: bool,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DismissRequest {
    pub request_id: String,
    pub canceled: bool,
    pub hardware_wallet: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    TxRequestShownSheet {
        source: RequestSource,
        request_type: RequestType,
    },
    TxRequestApprove {
        source: RequestSource,
        request_type: RequestType,
        dapp_name: String,
        dapp_url: String,
        is_hardware_wallet: bool,
        chain_id: ChainId,
    },
    TxRequestReject {
        source: RequestSource,
        request_type: RequestType,
        is_hardware_wallet: bool,
    },
}

impl AnalyticsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TxRequestShownSheet { .. } => "tx_request.shown_sheet",
            Self::TxRequestApprove { .. } => "tx_request.approve",
            Self::TxRequestReject { .. } => "tx_request.reject",
        }
    }
}
