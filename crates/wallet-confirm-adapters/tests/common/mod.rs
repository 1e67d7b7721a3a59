#![allow(dead_code)]

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value};
use tiny_http::{Response, Server, StatusCode};

use wallet_confirm_adapters::{AdapterConfig, RpcClient};

pub type RpcHandler = fn(&str, &Value) -> Result<Value, String>;

/// Methods seen by a mock node, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct RpcLog {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

impl RpcLog {
    pub fn methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("rpc log")
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }

    pub fn params_of(&self, method: &str) -> Option<Value> {
        self.calls
            .lock()
            .expect("rpc log")
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
    }
}

/// Serves JSON-RPC 2.0 on an ephemeral port until the test process exits.
pub fn spawn_rpc_server(handler: RpcHandler) -> (String, RpcLog) {
    let server = Server::http("127.0.0.1:0").expect("start server");
    let url = format!("http://{}", server.server_addr());
    let log = RpcLog::default();
    let calls = Arc::clone(&log.calls);

    thread::spawn(move || {
        for _ in 0..256 {
            let mut req = match server.recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            let mut body = String::new();
            if req.as_reader().read_to_string(&mut body).is_err() {
                continue;
            }
            let envelope: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
            let method = envelope["method"].as_str().unwrap_or_default().to_owned();
            let params = envelope["params"].clone();
            if let Ok(mut g) = calls.lock() {
                g.push((method.clone(), params.clone()));
            }

            let payload = match handler(&method, &params) {
                Ok(result) => json!({"jsonrpc": "2.0", "id": envelope["id"], "result": result}),
                Err(message) => json!({
                    "jsonrpc": "2.0",
                    "id": envelope["id"],
                    "error": {"code": -32000, "message": message},
                }),
            };
            let response =
                Response::from_string(payload.to_string()).with_status_code(StatusCode(200));
            let _ = req.respond(response);
        }
    });

    (url, log)
}

pub fn config_for(chain_id: u64, url: &str) -> AdapterConfig {
    let mut cfg = AdapterConfig {
        rpc_timeout_ms: 5_000,
        ..AdapterConfig::default()
    };
    cfg.rpc_urls.insert(chain_id, url.to_owned());
    cfg
}

pub fn rpc_for(chain_id: u64, url: &str) -> RpcClient {
    RpcClient::with_config(&config_for(chain_id, url)).expect("rpc client")
}

/// A mainnet-like node: 1 gwei base fee, 2 gwei tip, 30M block gas limit,
/// 1 ETH balance, nonce 7, no contract code.
pub fn mainnet_node(method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "eth_getBlockByNumber" => Ok(json!({
            "number": "0x10",
            "baseFeePerGas": "0x3b9aca00",
            "gasLimit": "0x1c9c380",
        })),
        "eth_maxPriorityFeePerGas" => Ok(json!("0x77359400")),
        "eth_gasPrice" => Ok(json!("0x12a05f200")),
        "eth_estimateGas" => {
            if params[0].get("gas").is_some() {
                return Err("estimate must not carry gas".to_owned());
            }
            Ok(json!("0x5208"))
        }
        "eth_getBalance" => Ok(json!("0xde0b6b3a7640000")),
        "eth_getTransactionCount" => Ok(json!("0x7")),
        "eth_getCode" => Ok(json!("0x")),
        "eth_sendRawTransaction" => Ok(json!(
            "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb"
        )),
        other => Err(format!("method not found: {other}")),
    }
}
