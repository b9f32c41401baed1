//! Per-user, per-month submission flow
//!
//! Drives one composite key through
//! `NotChecked → Checking → {Allowed | Blocked} → Submitting → {Recorded | Failed}`,
//! consulting the local cache before the ledger and marking it after any
//! confirmed existence signal.

use tracing::{debug, info};

use crate::cache::LocalCache;
use crate::client::LedgerClient;
use crate::error::{LedgerError, Result};
use crate::record::{CompositeKey, SubmissionRecord};

/// What blocked a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockReason {
    /// Local cache already holds the key
    Cache,
    /// Ledger answered that the key exists
    Remote,
}

/// Flow state for one composite key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    NotChecked,
    Checking,
    Allowed,
    Blocked(BlockReason),
    Submitting,
    /// `remote` is false when the ledger is unconfigured and only the
    /// local cache reflects the submission
    Recorded { remote: bool },
    Failed,
}

impl SubmissionState {
    /// Whether the flow has reached a final state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionState::Blocked(_) | SubmissionState::Recorded { .. } | SubmissionState::Failed
        )
    }
}

/// Check-then-submit flow over a ledger client and a local cache
pub struct SubmissionFlow<'a> {
    client: &'a LedgerClient,
    cache: &'a dyn LocalCache,
    key: CompositeKey,
    state: SubmissionState,
}

impl<'a> SubmissionFlow<'a> {
    pub fn new(
        client: &'a LedgerClient,
        cache: &'a dyn LocalCache,
        email: &str,
        month_id: &str,
    ) -> Self {
        Self {
            client,
            cache,
            key: CompositeKey::new(email, month_id),
            state: SubmissionState::NotChecked,
        }
    }

    pub fn key(&self) -> &CompositeKey {
        &self.key
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    /// Decide whether a submission is allowed.
    ///
    /// Blocks only on a positive cache or ledger signal; every failure to
    /// get an answer allows the submission.
    pub async fn check(&mut self) -> SubmissionState {
        self.state = SubmissionState::Checking;

        self.state = if self.cache.has(&self.key) {
            debug!(key = %self.key, "Blocked by local cache");
            SubmissionState::Blocked(BlockReason::Cache)
        } else if self.client.exists(&self.key.email, &self.key.month_id).await {
            self.cache.set(&self.key);
            SubmissionState::Blocked(BlockReason::Remote)
        } else {
            SubmissionState::Allowed
        };

        info!(key = %self.key, state = ?self.state, "Submission check complete");
        self.state
    }

    /// Submit a record once the flow is `Allowed`.
    ///
    /// The record must carry the flow's composite key. No retry on failure.
    pub async fn submit(&mut self, record: &SubmissionRecord) -> Result<SubmissionState> {
        if self.state != SubmissionState::Allowed {
            return Err(LedgerError::InvalidState(format!(
                "cannot submit from {:?}",
                self.state
            )));
        }
        if record.key() != self.key {
            return Err(LedgerError::InvalidState(format!(
                "record key {} does not match flow key {}",
                record.key(),
                self.key
            )));
        }

        self.state = SubmissionState::Submitting;

        self.state = if self.client.submit(record).await {
            self.cache.set(&self.key);
            SubmissionState::Recorded { remote: true }
        } else if !self.client.is_configured() {
            self.cache.set(&self.key);
            SubmissionState::Recorded { remote: false }
        } else {
            SubmissionState::Failed
        };

        info!(key = %self.key, state = ?self.state, "Submission finished");
        Ok(self.state)
    }
}
