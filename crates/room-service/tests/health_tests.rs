//! Health endpoint integration tests.
//!
//! Tests the `/health` (liveness) and `/ready` (readiness) endpoints
//! using the `TestRoomServer` harness.

use room_test_utils::{FailingStore, TestRoomServer};
use std::sync::Arc;

/// Test that /health returns 200 and plain text "OK".
#[tokio::test]
async fn test_health_endpoint_returns_200() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

/// Test that /ready reports a healthy store.
#[tokio::test]
async fn test_ready_endpoint_when_store_healthy() -> Result<(), anyhow::Error> {
    let server = TestRoomServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client.get(format!("{}/ready", server.url())).send().await?;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["store"], "healthy");
    assert!(body.get("error").is_none());

    Ok(())
}

/// Test that /ready returns 503 with a generic message when the store is down.
#[tokio::test]
async fn test_ready_endpoint_when_store_down() -> Result<(), anyhow::Error> {
    let store = Arc::new(FailingStore::new());
    let server = TestRoomServer::spawn_with_store(store.clone()).await?;
    let client = reqwest::Client::new();

    store.fail_reads(true);

    let response = client.get(format!("{}/ready", server.url())).send().await?;

    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "not_ready");
    assert_eq!(body["store"], "unhealthy");
    assert_eq!(body["error"], "Service dependencies unavailable");
    assert!(!body.to_string().contains("injected"));

    Ok(())
}
