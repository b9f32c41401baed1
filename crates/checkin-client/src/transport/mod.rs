//! Transport layer for the ledger endpoint.
//!
//! - reqwest HTTP transport for real endpoints
//! - Mock transport for testing

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpTransport;
pub use mock::{MockReply, MockTransport, RecordedCall};
pub use traits::{
    LedgerTransport, ResponseVisibility, TransportReply, JSON_CONTENT_TYPE,
    PREFLIGHT_FREE_CONTENT_TYPE,
};
