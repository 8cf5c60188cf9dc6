//! Warehouse REST client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Default timeout for warehouse requests: 60 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for [`KustoClient`](super::KustoClient).
///
/// Endpoints come from the ingestion configuration; this only covers the
/// HTTP transport and the credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct KustoConfig {
    /// Warehouse request timeout in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "warehouse-timeout", env = "CACHEBENCH_WAREHOUSE_TIMEOUT", default_value = "60")
    )]
    #[serde(default = "default_timeout_secs")]
    pub http_timeout: u64,

    /// Bearer token sent with every warehouse request
    #[cfg_attr(
        feature = "config",
        arg(long = "warehouse-token", env = "CACHEBENCH_WAREHOUSE_TOKEN", hide_env_values = true)
    )]
    #[serde(default, skip_serializing)]
    pub access_token: Option<String>,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "warehouse-user-agent", env = "CACHEBENCH_WAREHOUSE_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for KustoConfig {
    fn default() -> Self {
        Self {
            http_timeout: default_timeout_secs(),
            access_token: None,
            user_agent: None,
        }
    }
}

impl KustoConfig {
    /// Returns the effective timeout, using the default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.http_timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.http_timeout)
        }
    }

    /// Returns the effective user agent, using the default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("cachebench/{}", env!("CARGO_PKG_VERSION")))
    }

    /// Sets the bearer token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Sets the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout = timeout_secs;
        self
    }
}
