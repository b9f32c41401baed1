//! HTTP surface for the ledger
//!
//! One dispatch endpoint, reachable at `/` and `/exec`:
//! - `GET` with `action=check&email=...&monthId=...` query parameters
//! - `POST` with a JSON body under any content type
//! - `OPTIONS` answers plain preflight probes
//!
//! Every reply is HTTP 200 with a JSON payload; failures are reported in
//! the payload's `success` field, never as error statuses.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        DefaultBodyLimit, Query, State,
    },
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::error::{LedgerServerError, Result};
use crate::ledger::Ledger;

pub type SharedLedger = Arc<Ledger>;

/// Largest POST body the ledger will buffer
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Build the ledger router
pub fn create_router(ledger: SharedLedger) -> Router {
    Router::new()
        .route("/", get(handle_get).post(handle_post).options(handle_options))
        .route("/exec", get(handle_get).post(handle_post).options(handle_options))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(ledger)
}

/// Serve the ledger on an already-bound listener
pub async fn serve(listener: TcpListener, ledger: SharedLedger) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, sheet = ledger.sheet_name(), "Ledger HTTP server listening");
    axum::serve(listener, create_router(ledger))
        .await
        .map_err(LedgerServerError::Io)
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    "OK"
}

/// OPTIONS /
async fn handle_options() -> Json<Value> {
    Json(json!({ "success": true, "message": "CORS preflight" }))
}

/// GET /?action=check&email=...&monthId=...
async fn handle_get(
    State(ledger): State<SharedLedger>,
    query: std::result::Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Json<Value> {
    let Query(params) = match query {
        Ok(query) => query,
        Err(rejection) => {
            warn!(error = %rejection, "GET query rejected");
            return Json(json!({
                "success": false,
                "error": format!("Invalid query: {}", rejection.body_text()),
            }));
        }
    };
    debug!(params = ?params, "GET request");
    Json(run_blocking(move || ledger.dispatch_query(&params)).await)
}

/// POST / with a JSON (or text/plain JSON) body
async fn handle_post(
    State(ledger): State<SharedLedger>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Json<Value> {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "POST body rejected");
            return Json(json!({
                "success": false,
                "error": format!("Request body rejected: {}", rejection.body_text()),
            }));
        }
    };
    debug!(bytes = body.len(), "POST request");

    if body.iter().all(u8::is_ascii_whitespace) {
        warn!("POST without body");
        return Json(json!({ "success": false, "error": "No data received" }));
    }

    let request: Value = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "POST body is not valid JSON");
            return Json(json!({
                "success": false,
                "error": format!("Invalid JSON: {}", e),
                "received": String::from_utf8_lossy(&body),
            }));
        }
    };

    Json(run_blocking(move || ledger.dispatch(request)).await)
}

/// Run a store-touching closure off the async workers
async fn run_blocking<F>(f: F) -> Value
where
    F: FnOnce() -> Value + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => value,
        Err(e) => {
            error!(error = %e, "Ledger task panicked");
            json!({ "success": false, "error": e.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ledger() -> SharedLedger {
        Arc::new(Ledger::new(Arc::new(MemoryStore::new()), "Responses"))
    }

    #[tokio::test]
    async fn test_post_empty_body() {
        let Json(reply) = handle_post(State(ledger()), Ok(Bytes::from_static(b"  "))).await;
        assert_eq!(reply["success"], false);
        assert_eq!(reply["error"], "No data received");
    }

    #[tokio::test]
    async fn test_post_invalid_json() {
        let Json(reply) = handle_post(State(ledger()), Ok(Bytes::from_static(b"action=check"))).await;
        assert_eq!(reply["success"], false);
        assert!(reply["error"].as_str().unwrap().starts_with("Invalid JSON"));
        assert_eq!(reply["received"], "action=check");
    }

    #[tokio::test]
    async fn test_post_non_utf8_body() {
        let body = Bytes::from_static(&[0xff, 0xfe, b'{']);
        let Json(reply) = handle_post(State(ledger()), Ok(body)).await;
        assert_eq!(reply["success"], false);
        assert!(reply["error"].as_str().unwrap().starts_with("Invalid JSON"));
        assert!(reply["received"].as_str().unwrap().ends_with('{'));
    }

    #[tokio::test]
    async fn test_post_then_get() {
        let shared = ledger();
        let body = json!({
            "action": "append",
            "data": {"email": "user@x.com", "monthId": "2024-05"}
        })
        .to_string();
        let Json(appended) = handle_post(State(shared.clone()), Ok(Bytes::from(body))).await;
        assert_eq!(appended["row"], 2);

        let mut params = HashMap::new();
        params.insert("action".to_string(), "check".to_string());
        params.insert("email".to_string(), "User@X.com".to_string());
        params.insert("monthId".to_string(), "2024-05".to_string());
        let Json(checked) = handle_get(State(shared), Ok(Query(params))).await;
        assert_eq!(checked["exists"], true);
    }

    #[tokio::test]
    async fn test_options_reply() {
        let Json(reply) = handle_options().await;
        assert_eq!(reply["message"], "CORS preflight");
    }
}
