use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use tm_chain_client::{Cast, SocialComposer};

/// Hands the cast to a social client through an HTTP hook.
pub(crate) struct WebhookComposer {
    url: Option<String>,
    http: Client,
}

impl WebhookComposer {
    pub(crate) fn new(url: Option<String>) -> Self {
        Self {
            url,
            http: Client::new(),
        }
    }
}

#[async_trait]
impl SocialComposer for WebhookComposer {
    async fn compose_cast(&self, cast: &Cast) -> Result<()> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| anyhow!("no compose endpoint configured (PLEDGE_COMPOSE_WEBHOOK_URL)"))?;

        let response = self
            .http
            .post(url)
            .json(cast)
            .send()
            .await
            .context("compose webhook transport")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("compose webhook HTTP {status}: {text}");
        }
        Ok(())
    }
}
