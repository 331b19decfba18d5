use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use serde_json::{Value, json};
use tm_api_types::{ChainId, TxHash, WalletAddress};
use tm_chain_client::{
    ChainSwitcher, ConnectOptions, ContractCall, ContractWriter, WalletConnector, WalletSession,
};
use tracing::debug;

use crate::abi::encode_call;
use crate::rpc::JsonRpcClient;

/// Wallet reachable through EIP-1193 methods over HTTP (e.g. a desktop wallet's
/// local RPC). Signing happens inside the wallet.
///
/// Reads `PLEDGE_WALLET_URL` from environment when no endpoint is given
/// (default: `http://127.0.0.1:1248`).
pub struct Eip1193Wallet {
    rpc: JsonRpcClient,
}

impl Default for Eip1193Wallet {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Eip1193Wallet {
    pub fn new(endpoint: Option<String>) -> Self {
        let endpoint = endpoint
            .or_else(|| std::env::var("PLEDGE_WALLET_URL").ok())
            .unwrap_or_else(|| "http://127.0.0.1:1248".to_string());
        Self {
            rpc: JsonRpcClient::new(endpoint),
        }
    }

    async fn chain_id(&self) -> Result<ChainId> {
        let raw: String = self.rpc.request("eth_chainId", json!([])).await?;
        ChainId::from_hex(&raw).ok_or_else(|| anyhow!("wallet returned malformed chain id {raw}"))
    }

    async fn session_from(&self, accounts: Vec<String>) -> Result<WalletSession> {
        let active_chain_id = self.chain_id().await?;
        let address = accounts.into_iter().next().map(WalletAddress);
        Ok(WalletSession {
            is_connected: address.is_some(),
            address,
            active_chain_id,
        })
    }
}

#[async_trait]
impl WalletConnector for Eip1193Wallet {
    async fn connect(&self, options: ConnectOptions) -> Result<WalletSession> {
        let accounts: Vec<String> = self
            .rpc
            .request("eth_requestAccounts", json!([]))
            .await
            .context("wallet connect")?;
        if accounts.is_empty() {
            bail!("wallet returned no accounts");
        }

        let session = self.session_from(accounts).await?;
        if session.active_chain_id != options.chain_id {
            debug!(
                "connected on chain {}, requested {}",
                session.active_chain_id, options.chain_id
            );
        }
        Ok(session)
    }

    async fn current_session(&self) -> Result<WalletSession> {
        let accounts: Vec<String> = self.rpc.request("eth_accounts", json!([])).await?;
        self.session_from(accounts).await
    }
}

#[async_trait]
impl ChainSwitcher for Eip1193Wallet {
    async fn switch_chain(&self, target: ChainId) -> Result<()> {
        let _: Value = self
            .rpc
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": target.to_hex() }]),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ContractWriter for Eip1193Wallet {
    async fn write_contract(&self, call: &ContractCall) -> Result<TxHash> {
        let from = call
            .account
            .as_ref()
            .ok_or_else(|| anyhow!("no account to send {} from", call.function.name()))?;

        let active = self.chain_id().await?;
        if active != call.chain {
            bail!(
                "wallet is on chain {active} but {} targets chain {}",
                call.function.name(),
                call.chain
            );
        }

        let hash: String = self
            .rpc
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": from.0,
                    "to": call.contract.0,
                    "data": encode_call(&call.function)?,
                }]),
            )
            .await?;
        Ok(TxHash(hash))
    }
}
