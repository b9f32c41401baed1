//! Mock transport for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use super::traits::*;
use crate::error::{LedgerError, Result};

/// Scripted outcome for one mock call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Readable reply with a JSON body
    Json(u16, serde_json::Value),
    /// Readable reply with a raw text body
    Text(u16, String),
    /// Opaque dispatch
    Opaque,
    /// Network-level failure
    Fail(String),
}

/// A request seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub body: Option<String>,
}

/// Mock transport.
///
/// Replies are consumed in order. Once the script runs out every call fails
/// with a transport error.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<RecordedCall>>,
    call_count: AtomicU32,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a reply.
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.push(reply);
        self
    }

    /// Queue a reply on a shared mock.
    pub fn push(&self, reply: MockReply) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(reply);
    }

    /// Number of requests issued.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests issued so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn next(&self, call: RecordedCall, visibility: ResponseVisibility) -> Result<TransportReply> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);

        let reply = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();

        let reply = match reply {
            Some(MockReply::Fail(message)) => return Err(LedgerError::Transport(message)),
            None => return Err(LedgerError::Transport("no scripted reply".to_string())),
            Some(MockReply::Opaque) => TransportReply::Opaque,
            Some(MockReply::Json(status, value)) => TransportReply::Readable {
                status,
                body: value.to_string(),
            },
            Some(MockReply::Text(status, body)) => TransportReply::Readable { status, body },
        };

        // An opaque request never exposes a body, whatever the server sent.
        match visibility {
            ResponseVisibility::Readable => Ok(reply),
            ResponseVisibility::Opaque => Ok(TransportReply::Opaque),
        }
    }
}

#[async_trait]
impl LedgerTransport for MockTransport {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<TransportReply> {
        let call = RecordedCall {
            method: "GET",
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            content_type: None,
            body: None,
        };
        self.next(call, ResponseVisibility::Readable)
    }

    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: String,
        visibility: ResponseVisibility,
    ) -> Result<TransportReply> {
        let call = RecordedCall {
            method: "POST",
            url: url.to_string(),
            query: Vec::new(),
            content_type: Some(content_type.to_string()),
            body: Some(body),
        };
        self.next(call, visibility)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_is_consumed_in_order() {
        let mock = MockTransport::new()
            .with_reply(MockReply::Text(500, "boom".into()))
            .with_reply(MockReply::Opaque);

        let first = mock.get("http://ledger", &[("action", "check")]).await.unwrap();
        assert_eq!(
            first,
            TransportReply::Readable { status: 500, body: "boom".into() }
        );

        let second = mock
            .post("http://ledger", JSON_CONTENT_TYPE, "{}".into(), ResponseVisibility::Readable)
            .await
            .unwrap();
        assert_eq!(second, TransportReply::Opaque);

        assert!(mock.get("http://ledger", &[]).await.is_err());
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.calls()[0].query, vec![("action".to_string(), "check".to_string())]);
    }
}
