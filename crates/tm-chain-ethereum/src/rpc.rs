use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::abi::decode_revert_reason;

/// JSON-RPC 2.0 client over HTTP.
pub struct JsonRpcClient {
    endpoint: String,
    http: reqwest::Client,
    next_id: AtomicU64,
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

/// Error object returned by a node or wallet.
#[derive(Debug, Clone, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcError {
    /// EIP-1193 code for a request the user rejected in the wallet.
    pub const USER_REJECTED: i64 = 4001;

    /// Human-readable revert text, completing a bare "execution reverted" with
    /// the reason decoded from `data` when the node only sent it there.
    pub fn revert_message(&self) -> String {
        let reason = self
            .data
            .as_ref()
            .and_then(Value::as_str)
            .and_then(decode_revert_reason);

        match reason {
            Some(reason) if !self.message.contains(&reason) => {
                format!("{}: {reason}", self.message.trim_end_matches(':'))
            }
            _ => self.message.clone(),
        }
    }
}

impl JsonRpcClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Issues `method`; a JSON-RPC error object comes back as an [`RpcError`]
    /// inside the `anyhow::Error` so callers can downcast it.
    pub async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{method} transport"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("{method} body"))?;

        // Some providers answer JSON-RPC errors with a non-2xx status.
        let parsed = serde_json::from_str::<RpcResponse>(&text);
        let envelope = match parsed {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => anyhow::bail!("{method} HTTP {status}: {text}"),
            Err(err) => return Err(err).with_context(|| format!("{method} parse")),
        };

        if let Some(err) = envelope.error {
            return Err(err.into());
        }

        serde_json::from_value(envelope.result.unwrap_or(Value::Null))
            .with_context(|| format!("{method} result"))
    }
}
