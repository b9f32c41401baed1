//! Error types for checkin-ledger

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, LedgerServerError>;
