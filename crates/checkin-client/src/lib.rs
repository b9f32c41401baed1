//! Check-in ledger client
//!
//! Submits one monthly feedback record per user to an append-only ledger
//! and avoids duplicates through a check-before-append handshake:
//! - Ordered check strategies (query GET, then preflight-free POST)
//! - Readable or opaque append acknowledgement
//! - Local cache as the fallback duplicate guard
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────┐
//! │       SubmissionFlow        │
//! │  (check → submit per key)   │
//! └──────────────┬──────────────┘
//!        ┌───────┴────────┐
//!        ▼                ▼
//! ┌─────────────┐  ┌─────────────┐
//! │ LedgerClient│  │ LocalCache  │
//! └──────┬──────┘  └─────────────┘
//!        ▼
//! ┌─────────────────┐
//! │ LedgerTransport │
//! │ (HTTP / Mock)   │
//! └─────────────────┘
//! ```
//!
//! Both client operations are fail-open: when no trustworthy answer is
//! available they resolve `false` instead of returning an error.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod flow;
pub mod protocol;
pub mod record;
pub mod transport;

// Re-export main types for convenience
pub use cache::{FileCache, LocalCache, MemoryCache};
pub use client::{CheckAnswer, LedgerClient};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use flow::{BlockReason, SubmissionFlow, SubmissionState};
pub use protocol::CheckStrategy;
pub use record::{CompositeKey, MonthStamp, SubmissionRecord};
pub use transport::{HttpTransport, LedgerTransport, ResponseVisibility, TransportReply};
