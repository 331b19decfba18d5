use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Numeric EIP-155 chain id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

impl ChainId {
    pub const ETHEREUM_MAINNET: ChainId = ChainId(1);

    /// `0x`-prefixed form used by wallet JSON-RPC methods.
    pub fn to_hex(self) -> String {
        format!("0x{:x}", self.0)
    }

    pub fn from_hex(value: &str) -> Option<Self> {
        let digits = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X"))?;
        u64::from_str_radix(digits, 16).ok().map(ChainId)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletAddress(pub String);

impl WalletAddress {
    /// `0x` followed by exactly 40 hex digits. Checksum casing is not verified.
    pub fn is_well_formed(&self) -> bool {
        match self.0.strip_prefix("0x") {
            Some(digits) => digits.len() == 40 && digits.chars().all(|c| c.is_ascii_hexdigit()),
            None => false,
        }
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Farcaster identifier of the viewing user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fid(pub u64);

impl fmt::Display for Fid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PledgeAttemptResponse {
    pub attempt_id: Uuid,
    pub phase: String,
    pub history: Vec<String>,
    pub account: Option<String>,
    pub simulation_error: Option<String>,
    pub tx_hash: Option<String>,
    pub submission_error: Option<String>,
    pub explorer_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareResponse {
    pub signer_fid: Option<u64>,
    pub share_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HasPledgedResponse {
    pub wallet_address: String,
    pub has_pledged: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractInfoResponse {
    pub contract_address: String,
    pub chain_id: u64,
    pub write_function: String,
    pub view_function: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_hex_round_trips_mainnet() {
        assert_eq!(ChainId::ETHEREUM_MAINNET.to_hex(), "0x1");
        assert_eq!(ChainId::from_hex("0x1"), Some(ChainId(1)));
        assert_eq!(ChainId::from_hex("0x2105"), Some(ChainId(8453)));
        assert_eq!(ChainId::from_hex("1"), None);
    }

    #[test]
    fn wallet_address_shape() {
        let good = WalletAddress("0x32AA964746ba2be65C71fe4A5cB3c4a023cA3e20".to_owned());
        assert!(good.is_well_formed());

        assert!(!WalletAddress("32AA964746ba2be65C71fe4A5cB3c4a023cA3e20".to_owned()).is_well_formed());
        assert!(!WalletAddress("0x1234".to_owned()).is_well_formed());
        assert!(!WalletAddress("0xZZAA964746ba2be65C71fe4A5cB3c4a023cA3e20".to_owned()).is_well_formed());
    }

    #[test]
    fn newtypes_serialize_transparently_as_tuple_structs() {
        let json = serde_json::to_string(&Fid(42)).unwrap();
        assert_eq!(json, "42");
    }
}
