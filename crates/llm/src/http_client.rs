//! HTTP Client Factory
//!
//! Proxy configuration and the reqwest client factory shared by every
//! HTTP-backed provider.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::ProviderConfig;

/// `ProviderConfig::options` key holding the per-request timeout in seconds.
pub const TIMEOUT_OPTION: &str = "timeout_secs";

/// Outbound proxy for provider traffic
#[derive(Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy URL, e.g. `http://proxy.internal:3128` or `socks5://127.0.0.1:1080`
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub username: Option<String>,
    /// Held in memory only; never serialized.
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Proxy URL with credentials removed, for logging.
    pub fn display_url(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut parsed) => {
                let _ = parsed.set_username("");
                let _ = parsed.set_password(None);
                parsed.to_string()
            }
            Err(_) => "<invalid proxy url>".to_string(),
        }
    }
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("url", &self.display_url())
            .field("username", &self.username)
            .finish()
    }
}

/// Build a `reqwest::Client` with the given proxy and request timeout.
///
/// - `Some(proxy)` -> route all traffic through the proxy
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
///
/// An unusable proxy URL is logged and skipped rather than aborting provider
/// construction.
pub fn build_http_client(proxy: Option<&ProxyConfig>, timeout: Option<Duration>) -> reqwest::Client {
    let mut builder = reqwest::Client::builder();
    match proxy {
        Some(cfg) => match reqwest::Proxy::all(&cfg.url) {
            Ok(mut p) => {
                if let (Some(u), Some(pw)) = (&cfg.username, &cfg.password) {
                    p = p.basic_auth(u, pw);
                }
                builder = builder.proxy(p);
            }
            Err(e) => {
                tracing::warn!(
                    proxy = %cfg.display_url(),
                    "Ignoring invalid proxy configuration: {}",
                    e
                );
                builder = builder.no_proxy();
            }
        },
        None => {
            builder = builder.no_proxy();
        }
    }
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().unwrap_or_else(|e| {
        tracing::warn!("Falling back to default HTTP client: {}", e);
        reqwest::Client::new()
    })
}

/// Build the client for a provider from its proxy and timeout options.
pub fn client_for(config: &ProviderConfig) -> reqwest::Client {
    let timeout = config
        .options
        .get(TIMEOUT_OPTION)
        .and_then(|v| v.as_f64())
        .filter(|secs| *secs > 0.0)
        .map(Duration::from_secs_f64);
    build_http_client(config.proxy.as_ref(), timeout)
}
