use tm_api_types::ChainId;

use crate::attempt::Phase;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PledgeError {
    #[error("wallet connection failed: {0}")]
    Connect(String),
    #[error(
        "failed to switch to {}; please switch chains manually in your wallet",
        chain_label(.chain)
    )]
    Switch { chain: ChainId, reason: String },
    /// Dry run predicts the pledge would revert; carries the node's revert text.
    #[error("{0}")]
    Revert(String),
    #[error("no wallet account available to pledge from")]
    NoAccount,
    #[error("transaction submission failed: {0}")]
    Submission(String),
    #[error("transaction confirmation failed: {0}")]
    Wait(String),
    /// The driving task went away (dropped or panicked) before a terminal phase.
    #[error("pledge interrupted while {}; please try again", .0.as_str())]
    Interrupted(Phase),
}

impl PledgeError {
    /// Raised before any signature prompt, so nothing was sent.
    pub fn is_pre_submission(&self) -> bool {
        matches!(
            self,
            PledgeError::Connect(_)
                | PledgeError::Switch { .. }
                | PledgeError::Revert(_)
                | PledgeError::NoAccount
                | PledgeError::Interrupted(
                    Phase::Connecting | Phase::SwitchingChain | Phase::Simulating
                )
        )
    }
}

fn chain_label(chain: &ChainId) -> String {
    if *chain == ChainId::ETHEREUM_MAINNET {
        "Ethereum mainnet".to_owned()
    } else {
        format!("chain {chain}")
    }
}

/// Connectors without a typed error for this case throw on reconnection even
/// when a session exists; the only signal is the message text.
pub fn is_already_connected(err: &anyhow::Error) -> bool {
    format!("{err:#}").contains("already connected")
}
