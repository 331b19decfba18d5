use serde::Serialize;
use tm_api_types::{TxHash, WalletAddress};
use uuid::Uuid;

use crate::error::PledgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Connecting,
    SwitchingChain,
    Simulating,
    Submitting,
    AwaitingConfirmation,
    Confirmed,
    Failed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Connecting => "connecting",
            Phase::SwitchingChain => "switching_chain",
            Phase::Simulating => "simulating",
            Phase::Submitting => "submitting",
            Phase::AwaitingConfirmation => "awaiting_confirmation",
            Phase::Confirmed => "confirmed",
            Phase::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Confirmed | Phase::Failed)
    }

    /// A new sign action may only start from here.
    pub fn accepts_new_attempt(self) -> bool {
        matches!(self, Phase::Idle | Phase::Confirmed | Phase::Failed)
    }

    pub fn can_advance_to(self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, SwitchingChain)
                | (SwitchingChain, Simulating)
                | (Simulating, Submitting)
                | (Submitting, AwaitingConfirmation)
                | (AwaitingConfirmation, Confirmed)
                | (
                    Connecting | SwitchingChain | Simulating | Submitting | AwaitingConfirmation,
                    Failed
                )
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal phase transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: Phase,
    pub to: Phase,
}

/// One user-initiated pledge, from the sign action to a terminal phase.
#[derive(Debug, Clone, PartialEq)]
pub struct PledgeAttempt {
    pub attempt_id: Uuid,
    pub phase: Phase,
    pub history: Vec<Phase>,
    pub account: Option<WalletAddress>,
    pub simulation_error: Option<String>,
    pub tx_hash: Option<TxHash>,
    pub submission_error: Option<PledgeError>,
}

impl Default for PledgeAttempt {
    fn default() -> Self {
        Self::new()
    }
}

impl PledgeAttempt {
    pub fn new() -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            phase: Phase::Idle,
            history: vec![Phase::Idle],
            account: None,
            simulation_error: None,
            tx_hash: None,
            submission_error: None,
        }
    }

    pub fn advance(&mut self, next: Phase) -> Result<(), TransitionError> {
        if !self.phase.can_advance_to(next) {
            return Err(TransitionError {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        self.history.push(next);
        Ok(())
    }

    /// Records `err` in the field the user sees for its stage and moves to `Failed`.
    pub fn fail(&mut self, err: PledgeError) -> Result<(), TransitionError> {
        self.advance(Phase::Failed)?;
        if err.is_pre_submission() {
            self.simulation_error = Some(err.to_string());
        } else {
            self.submission_error = Some(err);
        }
        Ok(())
    }

    /// User-facing failure text, whichever stage produced it.
    pub fn error_message(&self) -> Option<String> {
        self.simulation_error
            .clone()
            .or_else(|| self.submission_error.as_ref().map(ToString::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Phase; 8] = [
        Phase::Idle,
        Phase::Connecting,
        Phase::SwitchingChain,
        Phase::Simulating,
        Phase::Submitting,
        Phase::AwaitingConfirmation,
        Phase::Confirmed,
        Phase::Failed,
    ];

    #[test]
    fn terminal_phases_are_absorbing() {
        for terminal in [Phase::Confirmed, Phase::Failed] {
            for next in ALL {
                assert!(!terminal.can_advance_to(next), "{terminal:?} -> {next:?}");
            }
        }
    }

    #[test]
    fn phases_cannot_be_skipped() {
        assert!(!Phase::Idle.can_advance_to(Phase::SwitchingChain));
        assert!(!Phase::Connecting.can_advance_to(Phase::Simulating));
        assert!(!Phase::Simulating.can_advance_to(Phase::AwaitingConfirmation));
        assert!(!Phase::Submitting.can_advance_to(Phase::Confirmed));
        assert!(!Phase::Idle.can_advance_to(Phase::Failed));
    }

    #[test]
    fn every_in_flight_phase_can_fail() {
        for phase in ALL {
            let in_flight = !phase.is_terminal() && phase != Phase::Idle;
            assert_eq!(phase.can_advance_to(Phase::Failed), in_flight, "{phase:?}");
        }
    }

    #[test]
    fn only_idle_and_terminal_accept_new_attempts() {
        let accepting: Vec<Phase> = ALL
            .into_iter()
            .filter(|phase| phase.accepts_new_attempt())
            .collect();
        assert_eq!(accepting, vec![Phase::Idle, Phase::Confirmed, Phase::Failed]);
    }

    #[test]
    fn advance_records_history_and_rejects_illegal_steps() {
        let mut attempt = PledgeAttempt::new();
        attempt.advance(Phase::Connecting).unwrap();
        attempt.advance(Phase::SwitchingChain).unwrap();

        let err = attempt.advance(Phase::Submitting).unwrap_err();
        assert_eq!(err.from, Phase::SwitchingChain);
        assert_eq!(err.to, Phase::Submitting);
        assert_eq!(attempt.phase, Phase::SwitchingChain);
        assert_eq!(
            attempt.history,
            vec![Phase::Idle, Phase::Connecting, Phase::SwitchingChain]
        );
    }

    #[test]
    fn failure_lands_in_stage_specific_field() {
        let mut early = PledgeAttempt::new();
        early.advance(Phase::Connecting).unwrap();
        early
            .fail(PledgeError::Connect("User rejected the request.".to_owned()))
            .unwrap();
        assert_eq!(early.phase, Phase::Failed);
        assert!(early.simulation_error.is_some());
        assert!(early.submission_error.is_none());

        let mut late = PledgeAttempt::new();
        for phase in [
            Phase::Connecting,
            Phase::SwitchingChain,
            Phase::Simulating,
            Phase::Submitting,
        ] {
            late.advance(phase).unwrap();
        }
        late.fail(PledgeError::Submission("nonce too low".to_owned()))
            .unwrap();
        assert!(late.simulation_error.is_none());
        assert_eq!(
            late.submission_error,
            Some(PledgeError::Submission("nonce too low".to_owned()))
        );
        assert_eq!(late.error_message().as_deref(), Some("transaction submission failed: nonce too low"));
    }
}
