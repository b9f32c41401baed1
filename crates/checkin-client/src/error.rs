//! Error types for the ledger client
//!
//! None of these cross the public `exists`/`submit` boundary; the client
//! logs them and collapses them to a boolean outcome.

use thiserror::Error;

/// Ledger client error
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No endpoint URL configured (cache-only mode)
    #[error("Ledger endpoint not configured")]
    NotConfigured,

    /// Network unreachable, request blocked, or client construction failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Server answered with a non-2xx status
    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Server replied with a structured `success: false` payload
    #[error("Ledger rejected request: {0}")]
    Rejected(String),

    /// Response body cannot be read in the current transport mode
    #[error("Response is opaque")]
    Opaque,

    /// Submission flow driven out of order
    #[error("Invalid submission state: {0}")]
    InvalidState(String),
}

impl From<reqwest::Error> for LedgerError {
    fn from(e: reqwest::Error) -> Self {
        LedgerError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for LedgerError {
    fn from(e: serde_json::Error) -> Self {
        LedgerError::Parse(e.to_string())
    }
}

/// Result type for ledger client operations
pub type Result<T> = std::result::Result<T, LedgerError>;
