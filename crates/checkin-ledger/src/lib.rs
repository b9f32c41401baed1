//! Check-in ledger endpoint
//!
//! Append-only row store behind a single action-dispatched HTTP endpoint.
//! Clients ask `check` before `append`; the ledger itself never rejects
//! duplicates.
//!
//! ## Components
//!
//! - **RowStore**: named sheets of append-only rows (memory or SQLite)
//! - **Ledger**: `check` / `append` actions and request dispatch
//! - **HTTP**: axum router exposing the dispatch endpoint

pub mod config;
pub mod error;
pub mod http;
pub mod ledger;
pub mod store;

pub use config::Config;
pub use error::{LedgerServerError, Result};
pub use http::{create_router, serve, SharedLedger, MAX_BODY_BYTES};
pub use ledger::{AppendData, AppendReply, CheckReply, Ledger};
pub use store::{LedgerRow, MemoryStore, RowStore, SqliteStore, HEADER};
