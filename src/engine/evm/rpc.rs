// Velopool Engine: JSON-RPC Client
// Minimal Ethereum JSON-RPC 2.0 over HTTP, enough for read-only calls.

use super::abi::ContractCall;
use super::primitives::{hex_decode, hex_encode};
use crate::atoms::error::{EngineError, EngineResult};
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// JSON-RPC client bound to one endpoint.
/// No request timeout is configured; the reqwest defaults apply.
#[derive(Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        RpcClient {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Low-level JSON-RPC call
    pub(crate) async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> EngineResult<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id
        });

        debug!("[rpc] {} id={}", method, id);
        let resp = self.http.post(&self.url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(EngineError::rpc(method, format!("HTTP {}", status)));
        }

        let result: serde_json::Value = resp.json().await?;

        if let Some(error) = result.get("error") {
            return Err(EngineError::rpc(method, error.to_string()));
        }

        result
            .get("result")
            .cloned()
            .ok_or_else(|| EngineError::rpc(method, "response missing 'result' field"))
    }

    /// Call a contract (read-only) at the latest block and return the raw bytes
    pub async fn eth_call(&self, call: &ContractCall) -> EngineResult<Vec<u8>> {
        let result = self
            .rpc_call(
                "eth_call",
                serde_json::json!([
                    { "to": call.to.to_string(), "data": hex_encode(&call.data) },
                    "latest"
                ]),
            )
            .await?;
        let hex = result
            .as_str()
            .ok_or_else(|| EngineError::rpc("eth_call", "result is not a hex string"))?;
        hex_decode(hex).map_err(EngineError::Decode)
    }

    /// Get chain ID
    pub async fn eth_chain_id(&self) -> EngineResult<u64> {
        let result = self.rpc_call("eth_chainId", serde_json::json!([])).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| EngineError::rpc("eth_chainId", "result is not a hex string"))?;
        u64::from_str_radix(hex.strip_prefix("0x").unwrap_or(hex), 16)
            .map_err(|e| EngineError::Decode(format!("Parse chain ID: {}", e)))
    }
}
