use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use tm_api_types::{ChainId, Fid, TxHash, WalletAddress};

/// Trustless Manifesto contract on Ethereum mainnet.
pub const MANIFESTO_CONTRACT_ADDRESS: &str = "0x32AA964746ba2be65C71fe4A5cB3c4a023cA3e20";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSession {
    pub is_connected: bool,
    pub address: Option<WalletAddress>,
    pub active_chain_id: ChainId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOptions {
    pub chain_id: ChainId,
}

/// The two functions the manifesto contract exposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractFunction {
    Pledge,
    HasPledged(WalletAddress),
}

impl ContractFunction {
    pub const PLEDGE_SIGNATURE: &'static str = "pledge()";
    pub const HAS_PLEDGED_SIGNATURE: &'static str = "has_pledged(address)";

    pub fn name(&self) -> &'static str {
        match self {
            ContractFunction::Pledge => "pledge",
            ContractFunction::HasPledged(_) => "has_pledged",
        }
    }

    /// Canonical signature the selector is derived from.
    pub fn signature(&self) -> &'static str {
        match self {
            ContractFunction::Pledge => Self::PLEDGE_SIGNATURE,
            ContractFunction::HasPledged(_) => Self::HAS_PLEDGED_SIGNATURE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    pub contract: WalletAddress,
    pub function: ContractFunction,
    pub account: Option<WalletAddress>,
    pub chain: ChainId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub status: ReceiptStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cast {
    pub text: String,
    pub embeds: Vec<String>,
}

#[async_trait]
pub trait WalletConnector: Send + Sync {
    async fn connect(&self, options: ConnectOptions) -> Result<WalletSession>;
    async fn current_session(&self) -> Result<WalletSession>;
}

#[async_trait]
pub trait ChainSwitcher: Send + Sync {
    async fn switch_chain(&self, target: ChainId) -> Result<()>;
}

#[async_trait]
pub trait ContractSimulator: Send + Sync {
    /// Dry-runs `call`; an error carries the revert reason when the node reports one.
    async fn simulate_call(&self, call: &ContractCall) -> Result<()>;
}

#[async_trait]
pub trait ContractWriter: Send + Sync {
    async fn write_contract(&self, call: &ContractCall) -> Result<TxHash>;
}

#[async_trait]
pub trait ReceiptWatcher: Send + Sync {
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<Receipt>;
}

#[async_trait]
pub trait SocialComposer: Send + Sync {
    async fn compose_cast(&self, cast: &Cast) -> Result<()>;
}

/// Session context of the hosting social client.
pub trait ViewerContext: Send + Sync {
    fn viewer_fid(&self) -> Option<Fid>;
}

/// Context with a fixed (possibly absent) viewer.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticViewer(pub Option<Fid>);

impl ViewerContext for StaticViewer {
    fn viewer_fid(&self) -> Option<Fid> {
        self.0
    }
}
