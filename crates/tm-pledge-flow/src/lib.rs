//! Pledge flow for the Trustless Manifesto contract.
//!
//! [`PledgeFlowController`] walks one attempt through
//! `Idle → Connecting → SwitchingChain → Simulating → Submitting →
//! AwaitingConfirmation → Confirmed`, dropping to `Failed` from any in-flight
//! phase. The wallet, node and social client are injected as
//! [`Collaborators`].

pub mod attempt;
pub mod controller;
pub mod error;
pub mod share;

pub use attempt::{Phase, PledgeAttempt, TransitionError};
pub use controller::{
    Collaborators, DEFAULT_SWITCH_SETTLE_DELAY, FlowConfig, PledgeFlowController, SubmitOutcome,
};
pub use error::{PledgeError, is_already_connected};
pub use share::{SHARE_TEXT, ShareTarget};
