mod composer;
mod config;
mod pledge;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;
use tm_chain_client::StaticViewer;
use tm_chain_ethereum::{Eip1193Wallet, EthereumNode};
use tm_pledge_flow::{Collaborators, FlowConfig, PledgeFlowController};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::composer::WebhookComposer;
use crate::config::Settings;

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    error: String,
}

pub(crate) type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) controller: Arc<PledgeFlowController>,
    pub(crate) node: Arc<EthereumNode>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::from_env();
    let state = build_state(&settings);

    let app = router(state).layer(CorsLayer::permissive());

    info!("pledge-service listening on {}", settings.listen_addr);
    info!(
        "wallet endpoint {}, node endpoint {}",
        settings.wallet_url, settings.node_url
    );

    let listener = tokio::net::TcpListener::bind(settings.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_state(settings: &Settings) -> AppState {
    let wallet = Arc::new(Eip1193Wallet::new(Some(settings.wallet_url.clone())));
    let node = Arc::new(
        EthereumNode::new(Some(settings.node_url.clone()))
            .with_receipt_polling(settings.receipt_poll_interval, settings.receipt_timeout),
    );

    let deps = Collaborators {
        connector: wallet.clone(),
        switcher: wallet.clone(),
        simulator: node.clone(),
        writer: wallet,
        receipts: node.clone(),
        composer: Arc::new(WebhookComposer::new(settings.compose_webhook_url.clone())),
        viewer: Arc::new(StaticViewer(settings.viewer_fid)),
    };
    let config = FlowConfig {
        switch_settle_delay: settings.switch_settle_delay,
        app_url: settings.app_url.clone(),
        ..FlowConfig::default()
    };

    AppState {
        controller: Arc::new(PledgeFlowController::new(config, deps)),
        node,
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/contract", get(pledge::contract_info))
        .route("/pledge", post(pledge::pledge_start).get(pledge::pledge_status))
        .route("/pledged/{wallet_address}", get(pledge::has_pledged))
        .route("/share", post(pledge::share))
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "pledge-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "pledge-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(crate) fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

pub(crate) fn internal_error(err: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
