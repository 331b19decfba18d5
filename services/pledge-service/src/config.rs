use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tm_api_types::Fid;
use tm_chain_ethereum::node::{DEFAULT_POLL_INTERVAL, DEFAULT_RECEIPT_TIMEOUT};
use tm_pledge_flow::DEFAULT_SWITCH_SETTLE_DELAY;
use tracing::warn;

/// Service settings, read once from the environment at startup.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) listen_addr: SocketAddr,
    pub(crate) app_url: String,
    pub(crate) node_url: String,
    pub(crate) wallet_url: String,
    pub(crate) switch_settle_delay: Duration,
    pub(crate) receipt_poll_interval: Duration,
    pub(crate) receipt_timeout: Duration,
    pub(crate) compose_webhook_url: Option<String>,
    pub(crate) viewer_fid: Option<Fid>,
}

impl Settings {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };
        let optional = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let default_listen = SocketAddr::from(([0, 0, 0, 0], 8080));
        let settle_ms = parsed(&lookup, "PLEDGE_SWITCH_SETTLE_MS", millis(DEFAULT_SWITCH_SETTLE_DELAY));
        let poll_ms = parsed(&lookup, "PLEDGE_RECEIPT_POLL_MS", millis(DEFAULT_POLL_INTERVAL));
        let timeout_secs = parsed(
            &lookup,
            "PLEDGE_RECEIPT_TIMEOUT_SECS",
            DEFAULT_RECEIPT_TIMEOUT.as_secs(),
        );

        Self {
            listen_addr: parsed(&lookup, "PLEDGE_LISTEN_ADDR", default_listen),
            app_url: text("PLEDGE_APP_URL", "http://localhost:3000"),
            node_url: text("PLEDGE_NODE_URL", "https://cloudflare-eth.com"),
            wallet_url: text("PLEDGE_WALLET_URL", "http://127.0.0.1:1248"),
            switch_settle_delay: Duration::from_millis(settle_ms),
            receipt_poll_interval: Duration::from_millis(poll_ms),
            receipt_timeout: Duration::from_secs(timeout_secs),
            compose_webhook_url: optional("PLEDGE_COMPOSE_WEBHOOK_URL"),
            viewer_fid: optional("PLEDGE_VIEWER_FID").and_then(|raw| match raw.parse() {
                Ok(fid) => Some(Fid(fid)),
                Err(_) => {
                    warn!("ignoring non-numeric PLEDGE_VIEWER_FID '{}'", raw);
                    None
                }
            }),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("malformed {} '{}', using default", key, raw);
            default
        }),
        None => default,
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Settings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = settings(&[]);
        assert_eq!(settings.listen_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
        assert_eq!(settings.app_url, "http://localhost:3000");
        assert_eq!(settings.switch_settle_delay, Duration::from_millis(500));
        assert_eq!(settings.receipt_poll_interval, Duration::from_secs(4));
        assert_eq!(settings.receipt_timeout, Duration::from_secs(300));
        assert!(settings.compose_webhook_url.is_none());
        assert!(settings.viewer_fid.is_none());
    }

    #[test]
    fn overrides_are_read() {
        let settings = settings(&[
            ("PLEDGE_LISTEN_ADDR", "127.0.0.1:9000"),
            ("PLEDGE_APP_URL", "https://x.test"),
            ("PLEDGE_SWITCH_SETTLE_MS", "1200"),
            ("PLEDGE_COMPOSE_WEBHOOK_URL", "https://hooks.x.test/cast"),
            ("PLEDGE_VIEWER_FID", "42"),
        ]);
        assert_eq!(settings.listen_addr.port(), 9000);
        assert_eq!(settings.app_url, "https://x.test");
        assert_eq!(settings.switch_settle_delay, Duration::from_millis(1200));
        assert_eq!(
            settings.compose_webhook_url.as_deref(),
            Some("https://hooks.x.test/cast")
        );
        assert_eq!(settings.viewer_fid, Some(Fid(42)));
    }

    #[test]
    fn malformed_values_fall_back() {
        let settings = settings(&[
            ("PLEDGE_SWITCH_SETTLE_MS", "soon"),
            ("PLEDGE_VIEWER_FID", "alice"),
            ("PLEDGE_APP_URL", "   "),
        ]);
        assert_eq!(settings.switch_settle_delay, Duration::from_millis(500));
        assert!(settings.viewer_fid.is_none());
        assert_eq!(settings.app_url, "http://localhost:3000");
    }
}
