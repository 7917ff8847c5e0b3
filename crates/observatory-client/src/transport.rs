//! HTTP transport acquisition.
//!
//! The client asks a [`TransportProvider`] for its `reqwest::Client` once and
//! keeps it for its whole lifetime. Redirects are never followed
//! automatically; a 3xx answer reaches the invoker as-is.

use crate::error::Result;
use observatory_core::{ConfigError, ProxyConfig};
use reqwest::{redirect, Client, Proxy};
use std::time::Duration;

const USER_AGENT: &str = concat!("observatory-rs/", env!("CARGO_PKG_VERSION"));

/// Source of configured HTTP clients.
pub trait TransportProvider {
    /// Build an HTTP client bound to `timeout`.
    fn http_client(&self, timeout: Duration) -> Result<Client>;
}

/// How outbound requests reach the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProxyMode {
    /// Honour the `HTTP(S)_PROXY` / `NO_PROXY` environment
    #[default]
    System,
    /// Connect directly, ignoring any proxy environment
    Direct,
    /// Go through an explicit proxy, optionally authenticated
    Explicit {
        /// Proxy URL
        url: String,
        /// Basic-auth user name
        username: Option<String>,
        /// Basic-auth password
        password: Option<String>,
    },
}

/// Default [`TransportProvider`] backed by reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    mode: ProxyMode,
}

impl HttpTransport {
    /// Create a transport with an explicit proxy mode.
    #[must_use]
    pub fn new(mode: ProxyMode) -> Self {
        Self { mode }
    }

    /// Transport that bypasses every proxy.
    #[must_use]
    pub fn direct() -> Self {
        Self::new(ProxyMode::Direct)
    }

    /// Proxy mode in use.
    #[must_use]
    pub fn mode(&self) -> &ProxyMode {
        &self.mode
    }
}

impl From<&ProxyConfig> for HttpTransport {
    fn from(config: &ProxyConfig) -> Self {
        match &config.url {
            Some(url) if !url.trim().is_empty() => Self::new(ProxyMode::Explicit {
                url: url.clone(),
                username: config.username.clone(),
                password: config.password.clone(),
            }),
            _ => Self::new(ProxyMode::System),
        }
    }
}

impl TransportProvider for HttpTransport {
    fn http_client(&self, timeout: Duration) -> Result<Client> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none());

        match &self.mode {
            ProxyMode::System => {}
            ProxyMode::Direct => builder = builder.no_proxy(),
            ProxyMode::Explicit {
                url,
                username,
                password,
            } => {
                let mut proxy = Proxy::all(url.as_str()).map_err(|e| ConfigError::InvalidValue {
                    field: "proxy.url".to_string(),
                    reason: e.to_string(),
                })?;
                if let Some(user) = username {
                    tracing::debug!("using proxy {} with credentials for {}", url, user);
                    proxy = proxy.basic_auth(user, password.as_deref().unwrap_or_default());
                } else {
                    tracing::debug!("using proxy {}", url);
                }
                builder = builder.proxy(proxy);
            }
        }

        Ok(builder.build()?)
    }
}
