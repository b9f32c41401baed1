//! Client and ledger over a real socket

use checkin_client::{
    LedgerClient, LedgerConfig, MemoryCache, MonthStamp, SubmissionFlow, SubmissionRecord,
    SubmissionState,
};
use checkin_ledger::{serve, Ledger, MemoryStore, RowStore, SqliteStore, MAX_BODY_BYTES};
use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;

async fn start(store: Arc<dyn RowStore>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let ledger = Arc::new(Ledger::new(store, "Responses"));
    tokio::spawn(async move {
        let _ = serve(listener, ledger).await;
    });
    format!("http://{}/exec", addr)
}

fn record(email: &str) -> SubmissionRecord {
    let month = MonthStamp::from_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    SubmissionRecord::new(email, month)
        .with_completion(80.0)
        .with_bugs(1)
        .with_satisfaction(5.0)
}

#[tokio::test]
async fn test_submit_then_exists() {
    let store = Arc::new(MemoryStore::new());
    let url = start(store.clone()).await;
    let client = LedgerClient::new(LedgerConfig::with_endpoint(url)).unwrap();

    assert!(!client.exists("user@x.com", "2024-05").await);
    assert!(client.submit(&record("user@x.com")).await);

    let rows = store.data_rows("Responses").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].email, "user@x.com");
    assert_eq!(rows[0].month_id, "2024-05");
    assert_eq!(rows[0].month_name, "May 2024");
    assert_eq!(store.header("Responses").unwrap().unwrap()[0], "Email");

    assert!(client.exists("USER@X.com", "2024-05").await);
    assert!(!client.exists("user@x.com", "2024-06").await);
    assert!(!client.exists("other@x.com", "2024-05").await);
}

#[tokio::test]
async fn test_duplicate_submits_append_twice() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let url = start(store.clone()).await;
    let client = LedgerClient::new(LedgerConfig::with_endpoint(url)).unwrap();

    assert!(client.submit(&record("user@x.com")).await);
    assert!(client.submit(&record("user@x.com")).await);

    assert_eq!(store.data_rows("Responses").unwrap().len(), 2);
    assert!(client.exists("user@x.com", "2024-05").await);
}

#[tokio::test]
async fn test_flow_blocks_second_month_entry() {
    let url = start(Arc::new(MemoryStore::new())).await;
    let client = LedgerClient::new(LedgerConfig::with_endpoint(url)).unwrap();

    // First device records the check-in
    let first_cache = MemoryCache::new();
    let mut flow = SubmissionFlow::new(&client, &first_cache, "user@x.com", "2024-05");
    assert_eq!(flow.check().await, SubmissionState::Allowed);
    let state = flow.submit(&record("user@x.com")).await.unwrap();
    assert_eq!(state, SubmissionState::Recorded { remote: true });

    // A second device with an empty cache is blocked by the ledger
    let second_cache = MemoryCache::new();
    let mut flow = SubmissionFlow::new(&client, &second_cache, "User@X.com ", "2024-05");
    assert!(matches!(flow.check().await, SubmissionState::Blocked(_)));
    assert_eq!(second_cache.len(), 1);
}

#[tokio::test]
async fn test_raw_post_edge_cases() {
    let url = start(Arc::new(MemoryStore::new())).await;
    let http = reqwest::Client::new();

    let empty: Value = http.post(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(empty["success"], false);
    assert_eq!(empty["error"], "No data received");

    let unknown: Value = http
        .post(&url)
        .body(r#"{"action":"delete"}"#)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unknown["success"], false);
    assert_eq!(unknown["received"]["action"], "delete");

    let status: Value = http.get(&url).send().await.unwrap().json().await.unwrap();
    assert_eq!(status["success"], true);
    assert_eq!(status["message"], "Ledger is running");
}

#[tokio::test]
async fn test_bad_bodies_get_json_failures() {
    let store = Arc::new(MemoryStore::new());
    let url = start(store.clone()).await;
    let http = reqwest::Client::new();

    let response = http
        .post(&url)
        .header("content-type", "text/plain;charset=utf-8")
        .body(vec![0xff, 0xfe, b'{'])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    let reply: Value = response.json().await.unwrap();
    assert_eq!(reply["success"], false);
    assert!(reply["error"].as_str().unwrap().starts_with("Invalid JSON"));

    let oversized = vec![b' '; MAX_BODY_BYTES + 1024 * 1024];
    let response = http.post(&url).body(oversized).send().await.unwrap();
    assert_eq!(response.status(), 200);
    let reply: Value = response.json().await.unwrap();
    assert_eq!(reply["success"], false);
    assert!(reply["error"].as_str().unwrap().starts_with("Request body rejected"));

    assert!(!store.sheet_exists("Responses").unwrap());
}
