use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use tm_api_types::{
    ContractInfoResponse, HasPledgedResponse, PledgeAttemptResponse, ShareResponse, WalletAddress,
};
use tm_chain_client::ContractFunction;
use tm_chain_ethereum::ETHERSCAN_TX_URL;
use tm_pledge_flow::PledgeAttempt;
use tracing::info;

use crate::{AppState, ApiResult, bad_request, internal_error};

pub(crate) fn attempt_response(attempt: &PledgeAttempt) -> PledgeAttemptResponse {
    PledgeAttemptResponse {
        attempt_id: attempt.attempt_id,
        phase: attempt.phase.as_str().to_owned(),
        history: attempt
            .history
            .iter()
            .map(|phase| phase.as_str().to_owned())
            .collect(),
        account: attempt.account.as_ref().map(|account| account.0.clone()),
        simulation_error: attempt.simulation_error.clone(),
        tx_hash: attempt.tx_hash.as_ref().map(|hash| hash.0.clone()),
        submission_error: attempt.submission_error.as_ref().map(ToString::to_string),
        explorer_url: attempt
            .tx_hash
            .as_ref()
            .map(|hash| format!("{ETHERSCAN_TX_URL}/{hash}")),
    }
}

/// Starts a pledge in the background. `409` carries the attempt still in flight.
pub(crate) async fn pledge_start(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<PledgeAttemptResponse>), (StatusCode, Json<PledgeAttemptResponse>)> {
    match state.controller.spawn_pledge() {
        Some((started, _handle)) => {
            info!("pledge attempt {} accepted", started.attempt_id);
            Ok((StatusCode::ACCEPTED, Json(attempt_response(&started))))
        }
        None => Err((
            StatusCode::CONFLICT,
            Json(attempt_response(&state.controller.attempt())),
        )),
    }
}

pub(crate) async fn pledge_status(State(state): State<AppState>) -> Json<PledgeAttemptResponse> {
    Json(attempt_response(&state.controller.attempt()))
}

pub(crate) async fn share(State(state): State<AppState>) -> Json<ShareResponse> {
    let target = state.controller.share_signature().await;
    Json(ShareResponse {
        signer_fid: target.signer_fid.map(|fid| fid.0),
        share_url: target.share_url,
    })
}

pub(crate) async fn has_pledged(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> ApiResult<HasPledgedResponse> {
    let who = WalletAddress(wallet_address.trim().to_owned());
    if !who.is_well_formed() {
        return Err(bad_request("wallet_address must be 0x followed by 40 hex digits"));
    }

    let pledged = state
        .node
        .has_pledged(&state.controller.config().contract, &who)
        .await
        .map_err(internal_error)?;

    Ok(Json(HasPledgedResponse {
        wallet_address: who.0,
        has_pledged: pledged,
    }))
}

pub(crate) async fn contract_info(State(state): State<AppState>) -> Json<ContractInfoResponse> {
    let config = state.controller.config();
    Json(ContractInfoResponse {
        contract_address: config.contract.0.clone(),
        chain_id: config.target_chain.0,
        write_function: ContractFunction::PLEDGE_SIGNATURE.to_owned(),
        view_function: ContractFunction::HAS_PLEDGED_SIGNATURE.to_owned(),
    })
}
