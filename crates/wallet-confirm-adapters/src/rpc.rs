use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::U256;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use wallet_confirm_core::{ChainId, PortError};

use crate::AdapterConfig;

/// JSON-RPC 2.0 over HTTP, one endpoint per chain.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    urls: Arc<BTreeMap<ChainId, String>>,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn with_config(config: &AdapterConfig) -> Result<Self, PortError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.rpc_timeout_ms))
            .build()
            .map_err(|e| PortError::Transport(format!("failed to build rpc client: {e}")))?;
        Ok(Self {
            client,
            urls: Arc::new(config.rpc_urls.clone()),
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        chain_id: ChainId,
        method: &str,
        params: Value,
    ) -> Result<T, PortError> {
        let url = self
            .urls
            .get(&chain_id)
            .ok_or_else(|| PortError::NotFound(format!("no rpc url configured for chain {chain_id}")))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let payload = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(chain_id, method, id, "rpc request");

        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PortError::Transport(format!("{method} request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| PortError::Transport(format!("{method} json decode failed: {e}")))?;
        if !status.is_success() {
            return Err(PortError::Transport(format!("{method} status {status}: {body}")));
        }
        if let Some(err) = body.get("error") {
            return Err(PortError::Transport(format!("{method} returned error: {err}")));
        }
        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport(format!("{method} missing result")))?;
        serde_json::from_value(result)
            .map_err(|e| PortError::Validation(format!("{method} unexpected result: {e}")))
    }

    /// Calls a method whose result is a hex quantity that must fit in a `u64`.
    pub async fn call_u64(
        &self,
        chain_id: ChainId,
        method: &str,
        params: Value,
    ) -> Result<u64, PortError> {
        let value: U256 = self.call(chain_id, method, params).await?;
        u64::try_from(value)
            .map_err(|_| PortError::Validation(format!("{method} result {value} exceeds u64")))
    }
}

/// Reads an optional hex quantity field from a JSON object.
pub fn quantity_field(object: &Value, field: &str) -> Result<Option<U256>, PortError> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => serde_json::from_value(raw.clone())
            .map(Some)
            .map_err(|e| PortError::Validation(format!("invalid {field}: {e}"))),
    }
}

/// Drops `null` members so nodes never see explicit nulls for optional fields.
pub fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        other => other,
    }
}
