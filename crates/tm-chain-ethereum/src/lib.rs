//! Ethereum JSON-RPC adapters for the pledge collaborators.
//!
//! [`Eip1193Wallet`] talks to the user's wallet (accounts, chain switching,
//! sending the signed transaction). [`EthereumNode`] talks to a public node for
//! dry runs, view calls and receipts.

pub mod abi;
pub mod node;
pub mod rpc;
pub mod wallet;

pub use node::EthereumNode;
pub use rpc::{JsonRpcClient, RpcError};
pub use wallet::Eip1193Wallet;

pub const ETHERSCAN_TX_URL: &str = "https://etherscan.io/tx";

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{Json, Router, extract::State, routing::post};
    use serde_json::Value;
    use std::sync::Arc;

    type Responder = Arc<dyn Fn(&str, &Value) -> Value + Send + Sync>;

    /// Serves JSON-RPC on an ephemeral port. `respond` returns the response body
    /// without `jsonrpc`/`id`, i.e. `{"result": ..}` or `{"error": ..}`.
    pub(crate) async fn spawn_rpc_stub<F>(respond: F) -> anyhow::Result<String>
    where
        F: Fn(&str, &Value) -> Value + Send + Sync + 'static,
    {
        let responder: Responder = Arc::new(respond);
        let app = Router::new().route("/", post(handle)).with_state(responder);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(format!("http://{addr}"))
    }

    async fn handle(State(respond): State<Responder>, Json(request): Json<Value>) -> Json<Value> {
        let method = request["method"].as_str().unwrap_or_default();
        let mut body = respond(method, &request["params"]);
        body["jsonrpc"] = Value::from("2.0");
        body["id"] = request["id"].clone();
        Json(body)
    }
}
