//! Duplicate-aware ledger client
//!
//! Talks to the ledger endpoint through a [`LedgerTransport`]. Both public
//! operations are fail-open: every error is logged and collapsed to `false`.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};
use crate::protocol::{interpret_check_reply, interpret_submit_reply, CheckStrategy, LedgerRequest};
use crate::record::{CompositeKey, SubmissionRecord};
use crate::transport::{
    HttpTransport, LedgerTransport, ResponseVisibility, PREFLIGHT_FREE_CONTENT_TYPE,
};

/// Number of endpoint characters kept in log lines
const ENDPOINT_LOG_CHARS: usize = 50;

/// A usable answer to a check, with the strategy that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckAnswer {
    pub strategy: CheckStrategy,
    pub exists: bool,
}

/// Client for the check-in ledger endpoint
///
/// # Example
///
/// ```rust,no_run
/// use checkin_client::{LedgerClient, LedgerConfig, MonthStamp, SubmissionRecord};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LedgerClient::new(LedgerConfig::with_endpoint("https://ledger.example/exec"))?;
///
/// let month = MonthStamp::current();
/// if !client.exists("user@example.com", &month.id()).await {
///     let record = SubmissionRecord::new("user@example.com", month)
///         .with_completion(80.0)
///         .with_bugs(1)
///         .with_satisfaction(5.0);
///     client.submit(&record).await;
/// }
/// # Ok(())
/// # }
/// ```
pub struct LedgerClient {
    config: LedgerConfig,
    transport: Arc<dyn LedgerTransport>,
}

impl LedgerClient {
    /// Create a client over the reqwest transport
    pub fn new(config: LedgerConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout_secs)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over a custom transport
    pub fn with_transport(config: LedgerConfig, transport: Arc<dyn LedgerTransport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Whether the client will touch the network at all
    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Ask the ledger whether a submission exists for (email, month).
    ///
    /// Returns `true` only on a readable, well-formed, affirmative answer.
    /// Unconfigured endpoints, transport failures, and malformed replies
    /// all yield `false`.
    pub async fn exists(&self, email: &str, month_id: &str) -> bool {
        let key = CompositeKey::new(email, month_id);
        match self.probe(&key).await {
            Ok(answer) => {
                info!(
                    key = %key,
                    exists = answer.exists,
                    strategy = answer.strategy.name(),
                    "Ledger check answered"
                );
                answer.exists
            }
            Err(LedgerError::NotConfigured) => {
                warn!(key = %key, "Ledger endpoint not configured, relying on local cache");
                false
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Ledger check inconclusive, allowing submission");
                false
            }
        }
    }

    /// Try each configured strategy in order and return the first usable
    /// answer. Fails with the last strategy's error when none answers.
    pub async fn probe(&self, key: &CompositeKey) -> Result<CheckAnswer> {
        let endpoint = self.config.endpoint().ok_or(LedgerError::NotConfigured)?;

        let mut last_error = LedgerError::Parse("no check strategies configured".to_string());
        for &strategy in &self.config.check_strategies {
            match self.check_with(strategy, endpoint, key).await {
                Ok(exists) => return Ok(CheckAnswer { strategy, exists }),
                Err(e) => {
                    debug!(
                        strategy = strategy.name(),
                        error = %e,
                        "Check strategy gave no usable answer"
                    );
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    async fn check_with(
        &self,
        strategy: CheckStrategy,
        endpoint: &str,
        key: &CompositeKey,
    ) -> Result<bool> {
        let reply = match strategy {
            CheckStrategy::QueryGet => {
                let query = [
                    ("action", "check"),
                    ("email", key.email.as_str()),
                    ("monthId", key.month_id.as_str()),
                ];
                self.transport.get(endpoint, &query).await?
            }
            CheckStrategy::TextPost => {
                let body = LedgerRequest::Check {
                    email: &key.email,
                    month_id: &key.month_id,
                }
                .to_body()?;
                self.transport
                    .post(
                        endpoint,
                        PREFLIGHT_FREE_CONTENT_TYPE,
                        body,
                        ResponseVisibility::Readable,
                    )
                    .await?
            }
        };
        interpret_check_reply(&reply)
    }

    /// Append a record to the ledger.
    ///
    /// `true` means the record was dispatched and, as far as can be observed,
    /// accepted. With an opaque transport this is only a dispatch
    /// acknowledgement. Callers should mark the local cache on `true`.
    pub async fn submit(&self, record: &SubmissionRecord) -> bool {
        let key = record.key();
        let Some(endpoint) = self.config.endpoint() else {
            warn!(key = %key, "Ledger endpoint not configured, submission kept local only");
            return false;
        };

        info!(
            key = %key,
            endpoint = %redact(endpoint),
            visibility = ?self.config.submit_visibility,
            "Sending submission to ledger"
        );

        match self.append(endpoint, record).await {
            Ok(()) => {
                info!(key = %key, "Submission accepted by ledger");
                true
            }
            Err(e) => {
                error!(key = %key, error = %e, "Submission failed");
                false
            }
        }
    }

    async fn append(&self, endpoint: &str, record: &SubmissionRecord) -> Result<()> {
        let body = LedgerRequest::Append { data: record }.to_body()?;
        let reply = self
            .transport
            .post(
                endpoint,
                PREFLIGHT_FREE_CONTENT_TYPE,
                body,
                self.config.submit_visibility,
            )
            .await?;
        interpret_submit_reply(&reply)
    }
}

fn redact(endpoint: &str) -> String {
    if endpoint.chars().count() <= ENDPOINT_LOG_CHARS {
        return endpoint.to_string();
    }
    let head: String = endpoint.chars().take(ENDPOINT_LOG_CHARS).collect();
    format!("{}...", head)
}
