use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope, TxLegacy};
use alloy::dyn_abi::TypedData;
use alloy::eips::eip2718::Encodable2718;
use alloy::hex;
use alloy::network::TxSignerSync;
use alloy::primitives::{keccak256, Address, Bytes, TxKind, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use async_trait::async_trait;
use serde_json::{json, Value};

use wallet_confirm_core::{
    GasFeeParams, PortError, RequestMethod, SignerPort, TransactionDraft, TransactionResult,
    WalletHandle,
};

use crate::rpc::RpcClient;
use crate::AdapterConfig;

#[derive(Debug, Clone)]
enum SignerMode {
    Disabled(String),
    /// Keccak-derived placeholder signatures for local development.
    Deterministic,
    LocalKey(PrivateKeySigner),
}

#[derive(Debug, Clone)]
pub struct SignerAdapter {
    mode: SignerMode,
    rpc: RpcClient,
}

impl SignerAdapter {
    pub fn with_config(config: &AdapterConfig, rpc: RpcClient) -> Self {
        let mode = match config.signer_key.as_deref() {
            Some(key) => match key.parse::<PrivateKeySigner>() {
                Ok(signer) => SignerMode::LocalKey(signer),
                Err(e) => SignerMode::Disabled(format!("invalid signer key: {e}")),
            },
            None if config.strict_runtime_required() => SignerMode::Disabled(
                "deterministic signer is not allowed in the production profile".to_owned(),
            ),
            None => SignerMode::Deterministic,
        };
        if let SignerMode::Disabled(reason) = &mode {
            tracing::warn!(reason = %reason, "signer disabled");
        }
        Self { mode, rpc }
    }

    /// Address of the configured key, if any.
    pub fn address(&self) -> Option<Address> {
        match &self.mode {
            SignerMode::LocalKey(signer) => Some(signer.address()),
            _ => None,
        }
    }

    pub fn is_deterministic(&self) -> bool {
        matches!(self.mode, SignerMode::Deterministic)
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let SignerMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn signed_raw(&self, draft: &TransactionDraft) -> Result<Bytes, PortError> {
        self.check_mode()?;
        match &self.mode {
            SignerMode::LocalKey(signer) => sign_draft(signer, draft),
            _ => Ok(deterministic_raw(draft)),
        }
    }
}

fn ensure_owner(wallet: &WalletHandle, draft: &TransactionDraft) -> Result<(), PortError> {
    if wallet.address != draft.from {
        return Err(PortError::Validation(format!(
            "wallet {} cannot sign for {}",
            wallet.address, draft.from
        )));
    }
    Ok(())
}

fn to_u128(value: U256, field: &str) -> Result<u128, PortError> {
    u128::try_from(value).map_err(|_| PortError::Validation(format!("{field} out of range")))
}

fn sign_draft(signer: &PrivateKeySigner, draft: &TransactionDraft) -> Result<Bytes, PortError> {
    let to = draft.to.map(TxKind::Call).unwrap_or(TxKind::Create);
    let envelope: TxEnvelope = match &draft.gas_params {
        GasFeeParams::Eip1559 {
            max_base_fee,
            max_priority_fee,
        } => {
            let mut tx = TxEip1559 {
                chain_id: draft.chain_id,
                nonce: draft.nonce,
                gas_limit: draft.gas_limit,
                max_fee_per_gas: to_u128(
                    max_base_fee.saturating_add(*max_priority_fee),
                    "max fee per gas",
                )?,
                max_priority_fee_per_gas: to_u128(*max_priority_fee, "max priority fee")?,
                to,
                value: draft.value,
                input: draft.data.clone(),
                ..Default::default()
            };
            let signature = signer
                .sign_transaction_sync(&mut tx)
                .map_err(|e| PortError::Transport(format!("transaction signing failed: {e}")))?;
            tx.into_signed(signature).into()
        }
        GasFeeParams::Legacy { gas_price } => {
            let mut tx = TxLegacy {
                chain_id: Some(draft.chain_id),
                nonce: draft.nonce,
                gas_price: to_u128(*gas_price, "gas price")?,
                gas_limit: draft.gas_limit,
                to,
                value: draft.value,
                input: draft.data.clone(),
            };
            let signature = signer
                .sign_transaction_sync(&mut tx)
                .map_err(|e| PortError::Transport(format!("transaction signing failed: {e}")))?;
            tx.into_signed(signature).into()
        }
    };
    Ok(Bytes::from(envelope.encoded_2718()))
}

fn deterministic_raw(draft: &TransactionDraft) -> Bytes {
    let seed = json!({
        "chainId": draft.chain_id,
        "from": draft.from,
        "to": draft.to,
        "value": draft.value,
        "data": draft.data,
        "nonce": draft.nonce,
        "gas": draft.gas_limit,
    });
    let digest = keccak256(seed.to_string().as_bytes());
    let mut raw = Vec::with_capacity(33);
    raw.push(0x02);
    raw.extend_from_slice(digest.as_slice());
    Bytes::from(raw)
}

fn deterministic_signature(method: RequestMethod, signer: Address, payload: &[u8]) -> String {
    let mut seed = Vec::new();
    seed.extend_from_slice(method.as_str().as_bytes());
    seed.extend_from_slice(signer.as_slice());
    seed.extend_from_slice(payload);
    let hash = keccak256(seed);
    let mut sig = Vec::with_capacity(65);
    sig.extend_from_slice(hash.as_slice());
    sig.extend_from_slice(hash.as_slice());
    sig.push(27);
    hex::encode_prefixed(sig)
}

/// `personal_sign` payloads are hex when prefixed with `0x`, UTF-8 otherwise.
fn personal_message_bytes(message: &Value) -> Result<Vec<u8>, PortError> {
    let text = message
        .as_str()
        .ok_or_else(|| PortError::Validation("personal_sign message must be a string".to_owned()))?;
    if text.starts_with("0x") {
        if let Ok(bytes) = hex::decode(text) {
            return Ok(bytes);
        }
    }
    Ok(text.as_bytes().to_vec())
}

/// Typed data arrives either as an object or as its JSON string encoding.
fn typed_data(message: &Value) -> Result<TypedData, PortError> {
    let parsed = match message {
        Value::String(raw) => serde_json::from_str(raw),
        other => serde_json::from_value(other.clone()),
    };
    parsed.map_err(|e| PortError::Validation(format!("invalid typed data: {e}")))
}

#[async_trait]
impl SignerPort for SignerAdapter {
    async fn load_wallet(&self, address: Address) -> Result<WalletHandle, PortError> {
        self.check_mode()?;
        if let SignerMode::LocalKey(signer) = &self.mode {
            if signer.address() != address {
                return Err(PortError::NotFound(format!("no key loaded for {address}")));
            }
        }
        Ok(WalletHandle {
            address,
            is_hardware_wallet: false,
            device_id: None,
        })
    }

    async fn sign_message(
        &self,
        wallet: &WalletHandle,
        method: RequestMethod,
        message: &Value,
    ) -> Result<String, PortError> {
        self.check_mode()?;
        let signer = match &self.mode {
            SignerMode::LocalKey(signer) => signer,
            _ => {
                let payload = match method {
                    RequestMethod::PersonalSign => personal_message_bytes(message)?,
                    _ => message.to_string().into_bytes(),
                };
                return Ok(deterministic_signature(method, wallet.address, &payload));
            }
        };

        let signature = match method {
            RequestMethod::PersonalSign => {
                let payload = personal_message_bytes(message)?;
                signer.sign_message_sync(&payload)
            }
            RequestMethod::SignTypedData | RequestMethod::SignTypedDataV4 => {
                let hash = typed_data(message)?
                    .eip712_signing_hash()
                    .map_err(|e| PortError::Validation(format!("typed data hash failed: {e}")))?;
                signer.sign_hash_sync(&hash)
            }
            other => {
                return Err(PortError::Validation(format!(
                    "{} is not a message method",
                    other.as_str()
                )))
            }
        }
        .map_err(|e| PortError::Transport(format!("message signing failed: {e}")))?;
        Ok(hex::encode_prefixed(signature.as_bytes()))
    }

    async fn sign_transaction(
        &self,
        wallet: &WalletHandle,
        draft: &TransactionDraft,
    ) -> Result<Bytes, PortError> {
        ensure_owner(wallet, draft)?;
        self.signed_raw(draft)
    }

    async fn send_transaction(
        &self,
        wallet: &WalletHandle,
        draft: &TransactionDraft,
    ) -> Result<TransactionResult, PortError> {
        ensure_owner(wallet, draft)?;
        let raw = self.signed_raw(draft)?;
        let hash: B256 = if self.is_deterministic() {
            keccak256(&raw)
        } else {
            self.rpc
                .call(draft.chain_id, "eth_sendRawTransaction", json!([raw]))
                .await?
        };
        tracing::info!(chain_id = draft.chain_id, %hash, nonce = draft.nonce, "transaction submitted");
        Ok(TransactionResult {
            hash,
            nonce: draft.nonce,
            from: draft.from,
            to: draft.to,
            value: draft.value,
            data: draft.data.clone(),
        })
    }
}
