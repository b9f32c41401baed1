//! Core transport abstraction.
//!
//! The ledger endpoint sits behind a transport that may or may not let the
//! caller read response bodies. `LedgerTransport` models both outcomes so
//! the client protocol can be exercised without a network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Content type that carries a JSON body without triggering a CORS preflight.
pub const PREFLIGHT_FREE_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// Plain JSON content type, used by the smoke harness.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Whether a POST response can be observed by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseVisibility {
    /// Status and body are readable
    #[default]
    Readable,
    /// Fire-and-forget; only dispatch success is known
    Opaque,
}

/// What came back from a dispatched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportReply {
    /// The response could be read
    Readable { status: u16, body: String },
    /// The request was dispatched but nothing can be observed
    Opaque,
}

impl TransportReply {
    /// Readable reply with a 2xx status
    pub fn is_success(&self) -> bool {
        matches!(self, TransportReply::Readable { status, .. } if (200..300).contains(status))
    }
}

/// Transport used by [`crate::LedgerClient`].
///
/// Implementations return `Err` only for network-level failures; HTTP error
/// statuses come back as readable replies.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Issue a GET with the given query parameters appended to `url`.
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<TransportReply>;

    /// Issue a POST with a pre-serialized body.
    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
        visibility: ResponseVisibility,
    ) -> Result<TransportReply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_success_range() {
        let ok = TransportReply::Readable { status: 204, body: String::new() };
        let redirect = TransportReply::Readable { status: 302, body: String::new() };
        assert!(ok.is_success());
        assert!(!redirect.is_success());
        assert!(!TransportReply::Opaque.is_success());
    }
}
