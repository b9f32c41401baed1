//! Configuration for the ledger client

use serde::{Deserialize, Serialize};

use crate::protocol::CheckStrategy;
use crate::transport::ResponseVisibility;

/// Environment variable read by [`LedgerConfig::from_env`]
pub const ENDPOINT_ENV: &str = "CHECKIN_LEDGER_URL";

/// Ledger client configuration
///
/// Injected into [`crate::LedgerClient`] at construction and never mutated
/// afterwards. The client itself does not read the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ledger endpoint URL. `None` or blank selects cache-only mode.
    #[serde(default)]
    pub endpoint_url: Option<String>,

    /// Order in which check strategies are attempted
    #[serde(default = "default_check_strategies")]
    pub check_strategies: Vec<CheckStrategy>,

    /// Whether append responses can be read back
    #[serde(default)]
    pub submit_visibility: ResponseVisibility,

    /// Request timeout; `None` keeps the transport default
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_check_strategies() -> Vec<CheckStrategy> {
    CheckStrategy::DEFAULT_ORDER.to_vec()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            check_strategies: default_check_strategies(),
            submit_visibility: ResponseVisibility::default(),
            timeout_secs: None,
        }
    }
}

impl LedgerConfig {
    /// Config pointing at the given endpoint with default strategies
    pub fn with_endpoint(url: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Build from `CHECKIN_LEDGER_URL`. Intended for binaries and hosts.
    pub fn from_env() -> Self {
        Self {
            endpoint_url: std::env::var(ENDPOINT_ENV).ok(),
            ..Default::default()
        }
    }

    /// Set how append responses are observed
    pub fn with_submit_visibility(mut self, visibility: ResponseVisibility) -> Self {
        self.submit_visibility = visibility;
        self
    }

    /// Replace the check strategy order
    pub fn with_check_strategies(mut self, strategies: Vec<CheckStrategy>) -> Self {
        self.check_strategies = strategies;
        self
    }

    /// Trimmed endpoint, if one is set and non-blank
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Whether network calls are enabled at all
    pub fn is_configured(&self) -> bool {
        self.endpoint().is_some()
    }
}
