//! Wire protocol for the ledger endpoint
//!
//! Request bodies, check strategies, and the rules that turn a transport
//! reply into an answer. Interpretation is kept free of I/O so the
//! fail-open policy can be tested directly.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::record::SubmissionRecord;
use crate::transport::TransportReply;

/// Ways of asking the endpoint whether a key exists, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStrategy {
    /// GET with `action`, `email`, `monthId` query parameters
    QueryGet,
    /// POST of a JSON body under a preflight-free content type
    TextPost,
}

impl CheckStrategy {
    pub const DEFAULT_ORDER: [CheckStrategy; 2] = [CheckStrategy::QueryGet, CheckStrategy::TextPost];

    pub fn name(&self) -> &'static str {
        match self {
            CheckStrategy::QueryGet => "query_get",
            CheckStrategy::TextPost => "text_post",
        }
    }
}

/// Action-dispatched request body
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum LedgerRequest<'a> {
    Check {
        email: &'a str,
        #[serde(rename = "monthId")]
        month_id: &'a str,
    },
    Append {
        data: &'a SubmissionRecord,
    },
}

impl LedgerRequest<'_> {
    pub fn to_body(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Loosely-typed reply envelope. Debug fields the server adds are ignored.
#[derive(Debug, Deserialize)]
struct ReplyEnvelope {
    #[serde(default)]
    success: Option<serde_json::Value>,
    #[serde(default)]
    exists: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

fn readable_body(reply: &TransportReply) -> Result<&str> {
    match reply {
        TransportReply::Opaque => Err(LedgerError::Opaque),
        TransportReply::Readable { status, body } if !reply.is_success() => {
            Err(LedgerError::Status {
                status: *status,
                body: body.clone(),
            })
        }
        TransportReply::Readable { body, .. } => Ok(body.as_str()),
    }
}

/// Interpret a check reply.
///
/// `Ok` only for a 2xx body of the form `{"success": true, "exists": <bool>}`.
/// Every other shape is an error, which callers treat as "no usable answer".
pub fn interpret_check_reply(reply: &TransportReply) -> Result<bool> {
    let body = readable_body(reply)?;
    let envelope: ReplyEnvelope = serde_json::from_str(body)?;

    match envelope.success {
        Some(serde_json::Value::Bool(true)) => {}
        _ => {
            return Err(match envelope.error {
                Some(error) => LedgerError::Rejected(error),
                None => LedgerError::Parse("reply is not marked successful".to_string()),
            })
        }
    }

    match envelope.exists {
        Some(serde_json::Value::Bool(exists)) => Ok(exists),
        Some(other) => Err(LedgerError::Parse(format!("exists is not a boolean: {}", other))),
        None => Err(LedgerError::Parse("exists field missing".to_string())),
    }
}

/// Interpret an append reply.
///
/// Opaque replies and unparsable 2xx bodies count as accepted. A readable
/// `success: false` or a non-2xx status is an error.
pub fn interpret_submit_reply(reply: &TransportReply) -> Result<()> {
    let body = match readable_body(reply) {
        Err(LedgerError::Opaque) => return Ok(()),
        other => other?,
    };

    let envelope: ReplyEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::debug!(error = %e, "Unparsable append reply, assuming accepted");
            return Ok(());
        }
    };

    match envelope.success {
        Some(serde_json::Value::Bool(false)) => Err(LedgerError::Rejected(
            envelope.error.unwrap_or_else(|| "append rejected".to_string()),
        )),
        _ => Ok(()),
    }
}
