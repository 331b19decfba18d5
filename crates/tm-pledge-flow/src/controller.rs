use std::sync::Arc;
use std::time::Duration;

use tm_api_types::{ChainId, TxHash, WalletAddress};
use tm_chain_client::{
    ChainSwitcher, ConnectOptions, ContractCall, ContractFunction, ContractSimulator,
    ContractWriter, MANIFESTO_CONTRACT_ADDRESS, Receipt, ReceiptStatus, ReceiptWatcher,
    SocialComposer, ViewerContext, WalletConnector, WalletSession,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::attempt::{Phase, PledgeAttempt};
use crate::error::{PledgeError, is_already_connected};
use crate::share::ShareTarget;

pub const DEFAULT_SWITCH_SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub target_chain: ChainId,
    pub contract: WalletAddress,
    /// Wait after a chain switch so the connector reports the new chain.
    pub switch_settle_delay: Duration,
    /// Base URL shares point back to.
    pub app_url: String,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            target_chain: ChainId::ETHEREUM_MAINNET,
            contract: WalletAddress(MANIFESTO_CONTRACT_ADDRESS.to_owned()),
            switch_settle_delay: DEFAULT_SWITCH_SETTLE_DELAY,
            app_url: "http://localhost:3000".to_owned(),
        }
    }
}

/// External capabilities the flow drives.
#[derive(Clone)]
pub struct Collaborators {
    pub connector: Arc<dyn WalletConnector>,
    pub switcher: Arc<dyn ChainSwitcher>,
    pub simulator: Arc<dyn ContractSimulator>,
    pub writer: Arc<dyn ContractWriter>,
    pub receipts: Arc<dyn ReceiptWatcher>,
    pub composer: Arc<dyn SocialComposer>,
    pub viewer: Arc<dyn ViewerContext>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Another attempt is in flight; nothing was touched.
    Busy,
    Completed(PledgeAttempt),
}

/// Sequences connect, chain switch, dry run, submission and confirmation for
/// one pledge at a time.
pub struct PledgeFlowController {
    config: FlowConfig,
    deps: Collaborators,
    attempt: watch::Sender<PledgeAttempt>,
}

impl PledgeFlowController {
    pub fn new(config: FlowConfig, deps: Collaborators) -> Self {
        let (attempt, _) = watch::channel(PledgeAttempt::new());
        Self {
            config,
            deps,
            attempt,
        }
    }

    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    pub fn attempt(&self) -> PledgeAttempt {
        self.attempt.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PledgeAttempt> {
        self.attempt.subscribe()
    }

    /// Runs one pledge attempt to a terminal phase. Returns [`SubmitOutcome::Busy`]
    /// without side effects while a previous attempt is still in flight.
    pub async fn submit_pledge(&self) -> SubmitOutcome {
        let Some(attempt_id) = self.try_begin() else {
            debug!("pledge already in flight; ignoring sign action");
            return SubmitOutcome::Busy;
        };
        self.finish(attempt_id).await
    }

    /// Starts an attempt and drives it on a background task. Returns the freshly
    /// started attempt, or `None` while another one is in flight.
    pub fn spawn_pledge(
        self: &Arc<Self>,
    ) -> Option<(PledgeAttempt, JoinHandle<SubmitOutcome>)> {
        let Some(attempt_id) = self.try_begin() else {
            debug!("pledge already in flight; ignoring sign action");
            return None;
        };
        let started = self.attempt();
        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move { controller.finish(attempt_id).await });
        Some((started, handle))
    }

    async fn finish(&self, attempt_id: Uuid) -> SubmitOutcome {
        let _in_flight = InFlight {
            attempt: &self.attempt,
            attempt_id,
        };
        info!("pledge attempt {} started", attempt_id);

        match self.run().await {
            Ok(receipt) => {
                self.advance(Phase::Confirmed);
                info!(
                    "pledge attempt {} confirmed in block {:?}",
                    attempt_id, receipt.block_number
                );
            }
            Err(err) => {
                error!("pledge attempt {} failed: {}", attempt_id, err);
                self.attempt.send_modify(|attempt| {
                    if let Err(transition) = attempt.fail(err) {
                        error!("{}", transition);
                    }
                });
            }
        }

        SubmitOutcome::Completed(self.attempt())
    }

    /// Replaces a finished (or never started) attempt with a fresh one already in
    /// `Connecting`, in one step so concurrent callers cannot both start.
    fn try_begin(&self) -> Option<Uuid> {
        let mut started = None;
        self.attempt.send_if_modified(|current| {
            if !current.phase.accepts_new_attempt() {
                return false;
            }
            let mut fresh = PledgeAttempt::new();
            if fresh.advance(Phase::Connecting).is_err() {
                return false;
            }
            started = Some(fresh.attempt_id);
            *current = fresh;
            true
        });
        started
    }

    fn advance(&self, next: Phase) {
        self.attempt.send_modify(|attempt| {
            if let Err(err) = attempt.advance(next) {
                error!("{}", err);
            }
        });
    }

    async fn run(&self) -> Result<Receipt, PledgeError> {
        let session = self.ensure_connected().await?;
        self.attempt
            .send_modify(|attempt| attempt.account = session.address.clone());

        self.advance(Phase::SwitchingChain);
        self.ensure_target_chain(&session).await?;

        self.advance(Phase::Simulating);
        let call = self.pledge_call(session.address)?;
        self.deps
            .simulator
            .simulate_call(&call)
            .await
            .map_err(|err| PledgeError::Revert(format!("{err:#}")))?;

        self.advance(Phase::Submitting);
        let tx_hash = self
            .deps
            .writer
            .write_contract(&call)
            .await
            .map_err(|err| PledgeError::Submission(format!("{err:#}")))?;
        info!("pledge submitted as {}", tx_hash);

        self.attempt.send_modify(|attempt| {
            attempt.tx_hash = Some(tx_hash.clone());
            if let Err(err) = attempt.advance(Phase::AwaitingConfirmation) {
                error!("{}", err);
            }
        });

        self.await_confirmation(&tx_hash).await
    }

    async fn ensure_connected(&self) -> Result<WalletSession, PledgeError> {
        match self.deps.connector.current_session().await {
            Ok(session) if session.is_connected => return Ok(session),
            Ok(_) => {}
            Err(err) => warn!("could not read wallet session, connecting: {:#}", err),
        }

        let options = ConnectOptions {
            chain_id: self.config.target_chain,
        };
        match self.deps.connector.connect(options).await {
            Ok(session) => Ok(session),
            Err(err) if is_already_connected(&err) => {
                debug!("connector reports an existing session: {:#}", err);
                self.deps
                    .connector
                    .current_session()
                    .await
                    .map_err(|err| PledgeError::Connect(format!("{err:#}")))
            }
            Err(err) => Err(PledgeError::Connect(format!("{err:#}"))),
        }
    }

    async fn ensure_target_chain(&self, session: &WalletSession) -> Result<(), PledgeError> {
        let target = self.config.target_chain;
        if session.active_chain_id == target {
            return Ok(());
        }

        info!(
            "switching wallet from chain {} to {}",
            session.active_chain_id, target
        );
        self.deps
            .switcher
            .switch_chain(target)
            .await
            .map_err(|err| {
                warn!("chain switch failed: {:#}", err);
                PledgeError::Switch {
                    chain: target,
                    reason: format!("{err:#}"),
                }
            })?;

        tokio::time::sleep(self.config.switch_settle_delay).await;
        Ok(())
    }

    fn pledge_call(&self, account: Option<WalletAddress>) -> Result<ContractCall, PledgeError> {
        let account = account.ok_or(PledgeError::NoAccount)?;
        Ok(ContractCall {
            contract: self.config.contract.clone(),
            function: ContractFunction::Pledge,
            account: Some(account),
            chain: self.config.target_chain,
        })
    }

    async fn await_confirmation(&self, tx_hash: &TxHash) -> Result<Receipt, PledgeError> {
        let receipt = self
            .deps
            .receipts
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|err| PledgeError::Wait(format!("{err:#}")))?;

        match receipt.status {
            ReceiptStatus::Success => Ok(receipt),
            ReceiptStatus::Reverted => Err(PledgeError::Wait(format!(
                "transaction {tx_hash} reverted on-chain"
            ))),
        }
    }

    /// Opens the social composer with a post pointing back at the app. Sharing
    /// is best effort: composer failures are logged and never touch the attempt.
    pub async fn share_signature(&self) -> ShareTarget {
        let target = ShareTarget::new(&self.config.app_url, self.deps.viewer.viewer_fid());
        if let Err(err) = self.deps.composer.compose_cast(&target.cast()).await {
            warn!("failed to open compose: {:#}", err);
        }
        target
    }
}

/// Fails the attempt if its driver is dropped or unwinds before a terminal phase,
/// so the single-flight guard is always released.
struct InFlight<'a> {
    attempt: &'a watch::Sender<PledgeAttempt>,
    attempt_id: Uuid,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.attempt.send_if_modified(|attempt| {
            if attempt.attempt_id != self.attempt_id || attempt.phase.is_terminal() {
                return false;
            }
            let phase = attempt.phase;
            warn!(
                "pledge attempt {} interrupted in {}",
                self.attempt_id,
                phase.as_str()
            );
            match attempt.fail(PledgeError::Interrupted(phase)) {
                Ok(()) => true,
                Err(err) => {
                    error!("{}", err);
                    false
                }
            }
        });
    }
}
