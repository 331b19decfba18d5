use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tm_api_types::{ChainId, TxHash, WalletAddress};
use tm_chain_client::{
    ContractCall, ContractFunction, ContractSimulator, Receipt, ReceiptStatus, ReceiptWatcher,
};
use tokio::time::Instant;
use tracing::debug;

use crate::abi::{decode_bool, encode_call};
use crate::rpc::{JsonRpcClient, RpcError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(4);
pub const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Public node used for read-only calls and receipt polling.
///
/// Reads `PLEDGE_NODE_URL` from environment when no endpoint is given
/// (default: `https://cloudflare-eth.com`).
pub struct EthereumNode {
    rpc: JsonRpcClient,
    poll_interval: Duration,
    timeout: Duration,
}

impl Default for EthereumNode {
    fn default() -> Self {
        Self::new(None)
    }
}

impl EthereumNode {
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint
            .or_else(|| std::env::var("PLEDGE_NODE_URL").ok())
            .unwrap_or_else(|| "https://cloudflare-eth.com".to_string());
        Self {
            rpc: JsonRpcClient::new(endpoint),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    pub fn with_receipt_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.timeout = timeout;
        self
    }

    async fn eth_call(&self, call: &ContractCall) -> Result<String> {
        let mut tx = Map::new();
        if let Some(from) = &call.account {
            tx.insert("from".to_owned(), Value::String(from.0.clone()));
        }
        tx.insert("to".to_owned(), Value::String(call.contract.0.clone()));
        tx.insert("data".to_owned(), Value::String(encode_call(&call.function)?));

        self.rpc.request("eth_call", json!([tx, "latest"])).await
    }

    /// `has_pledged(who)` view call against `contract`.
    pub async fn has_pledged(&self, contract: &WalletAddress, who: &WalletAddress) -> Result<bool> {
        let call = ContractCall {
            contract: contract.clone(),
            function: ContractFunction::HasPledged(who.clone()),
            account: None,
            chain: ChainId::ETHEREUM_MAINNET,
        };
        let word = self.eth_call(&call).await?;
        decode_bool(&word)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl RawReceipt {
    fn into_receipt(self) -> Result<Receipt> {
        let status = match self.status.as_deref() {
            Some("0x1") => ReceiptStatus::Success,
            Some("0x0") => ReceiptStatus::Reverted,
            other => bail!("unexpected receipt status {other:?}"),
        };
        let block_number = self
            .block_number
            .as_deref()
            .and_then(|raw| u64::from_str_radix(raw.trim_start_matches("0x"), 16).ok());

        Ok(Receipt {
            tx_hash: TxHash(self.transaction_hash),
            block_number,
            status,
        })
    }
}

#[async_trait]
impl ContractSimulator for EthereumNode {
    async fn simulate_call(&self, call: &ContractCall) -> Result<()> {
        match self.eth_call(call).await {
            Ok(_) => Ok(()),
            Err(err) => match err.downcast_ref::<RpcError>() {
                Some(rpc) => Err(anyhow!(rpc.revert_message())),
                None => Err(err),
            },
        }
    }
}

#[async_trait]
impl ReceiptWatcher for EthereumNode {
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<Receipt> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let receipt: Option<RawReceipt> = self
                .rpc
                .request("eth_getTransactionReceipt", json!([tx_hash.0]))
                .await?;

            if let Some(receipt) = receipt {
                return receipt.into_receipt();
            }

            if Instant::now() + self.poll_interval > deadline {
                bail!("timed out waiting for receipt of {tx_hash}");
            }
            debug!("receipt for {} not available yet", tx_hash);
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::encode_error_string;
    use crate::test_support::spawn_rpc_stub;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CONTRACT: &str = "0x32AA964746ba2be65C71fe4A5cB3c4a023cA3e20";
    const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";

    fn pledge_call() -> ContractCall {
        ContractCall {
            contract: WalletAddress(CONTRACT.to_owned()),
            function: ContractFunction::Pledge,
            account: Some(WalletAddress(ACCOUNT.to_owned())),
            chain: ChainId::ETHEREUM_MAINNET,
        }
    }

    #[tokio::test]
    async fn simulation_surfaces_revert_reason_from_data() -> Result<()> {
        let url = spawn_rpc_stub(|_, _| {
            json!({ "error": {
                "code": 3,
                "message": "execution reverted",
                "data": encode_error_string("already pledged"),
            }})
        })
        .await?;

        let err = EthereumNode::new(Some(url))
            .simulate_call(&pledge_call())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "execution reverted: already pledged");
        Ok(())
    }

    #[tokio::test]
    async fn simulation_with_garbled_revert_data_still_errors() -> Result<()> {
        let url = spawn_rpc_stub(|_, _| {
            json!({ "error": { "code": 3, "message": "execution reverted", "data": "0xaé1" } })
        })
        .await?;

        let node = EthereumNode::new(Some(url));
        let outcome = tokio::spawn(async move { node.simulate_call(&pledge_call()).await }).await?;
        assert_eq!(outcome.unwrap_err().to_string(), "execution reverted");
        Ok(())
    }

    #[tokio::test]
    async fn simulation_passes_on_empty_return() -> Result<()> {
        let url = spawn_rpc_stub(|method, params| {
            assert_eq!(method, "eth_call");
            assert_eq!(params[0]["from"], ACCOUNT);
            assert_eq!(params[1], "latest");
            json!({ "result": "0x" })
        })
        .await?;

        EthereumNode::new(Some(url)).simulate_call(&pledge_call()).await
    }

    #[tokio::test]
    async fn has_pledged_decodes_bool() -> Result<()> {
        let url = spawn_rpc_stub(|_, _| json!({ "result": format!("0x{}1", "0".repeat(63)) })).await?;

        let pledged = EthereumNode::new(Some(url))
            .has_pledged(
                &WalletAddress(CONTRACT.to_owned()),
                &WalletAddress(ACCOUNT.to_owned()),
            )
            .await?;
        assert!(pledged);
        Ok(())
    }

    #[tokio::test]
    async fn receipt_is_polled_until_present() -> Result<()> {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = polls.clone();
        let url = spawn_rpc_stub(move |_, _| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                json!({ "result": null })
            } else {
                json!({ "result": {
                    "transactionHash": "0xfeed",
                    "blockNumber": "0x10",
                    "status": "0x1",
                }})
            }
        })
        .await?;

        let node = EthereumNode::new(Some(url))
            .with_receipt_polling(Duration::from_millis(5), Duration::from_secs(5));
        let receipt = node.wait_for_receipt(&TxHash("0xfeed".to_owned())).await?;

        assert_eq!(receipt.status, ReceiptStatus::Success);
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[tokio::test]
    async fn reverted_receipt_is_reported() -> Result<()> {
        let url = spawn_rpc_stub(|_, _| {
            json!({ "result": { "transactionHash": "0xfeed", "blockNumber": "0x10", "status": "0x0" } })
        })
        .await?;

        let receipt = EthereumNode::new(Some(url))
            .wait_for_receipt(&TxHash("0xfeed".to_owned()))
            .await?;
        assert_eq!(receipt.status, ReceiptStatus::Reverted);
        Ok(())
    }

    #[tokio::test]
    async fn receipt_wait_times_out() -> Result<()> {
        let url = spawn_rpc_stub(|_, _| json!({ "result": null })).await?;

        let node = EthereumNode::new(Some(url))
            .with_receipt_polling(Duration::from_millis(10), Duration::from_millis(25));
        let err = node
            .wait_for_receipt(&TxHash("0xfeed".to_owned()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        Ok(())
    }
}
