//! Concurrency integration tests.
//!
//! Two servers sharing one store stand in for a scaled-out deployment.

use reqwest::Client;
use room_service::models::RoomState;
use room_service::repositories::{InMemoryRoomStore, RoomStateStore};
use room_test_utils::{TestRoomServer, TEST_PASSCODE};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const JOINERS: usize = 32;

async fn open_room(client: &Client, server: &TestRoomServer, size: i64) -> Result<String, anyhow::Error> {
    let body: Value = client
        .post(format!("{}/api/v1/room/init", server.url()))
        .json(&json!({ "passcode": TEST_PASSCODE, "size": size }))
        .send()
        .await?
        .json()
        .await?;
    body["token"]
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| anyhow::anyhow!("init response has no token"))
}

async fn update_headcount(
    client: &Client,
    server: &TestRoomServer,
    headcount: u32,
) -> Result<u16, anyhow::Error> {
    Ok(client
        .post(format!("{}/api/v1/room/update-people", server.url()))
        .json(&json!({ "headcount": headcount }))
        .send()
        .await?
        .status()
        .as_u16())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_joins_racing_close_do_not_deadlock() -> Result<(), anyhow::Error> {
    let server = Arc::new(TestRoomServer::spawn().await?);
    let client = Client::new();

    let token = open_room(&client, &server, 1000).await?;
    let admin_token = server.admin_token(&client).await?;

    let mut handles = Vec::with_capacity(JOINERS + 1);
    for _ in 0..JOINERS {
        let client = client.clone();
        let url = format!("{}/api/v1/room/join", server.url());
        let token = token.clone();
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .json(&json!({ "token": token }))
                .send()
                .await
                .map(|r| r.status().as_u16())
        }));
    }
    {
        let client = client.clone();
        let url = format!("{}/api/v1/room/close", server.url());
        handles.push(tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(admin_token)
                .send()
                .await
                .map(|r| r.status().as_u16())
        }));
    }

    let all = futures::future::join_all(handles);
    let results = tokio::time::timeout(Duration::from_secs(20), all).await?;

    for result in results {
        let status = result??;
        // A join either got in before the close or saw the room closed.
        assert!(status == 200 || status == 409, "unexpected status {status}");
    }

    let body: Value = client
        .get(format!("{}/api/v1/room/status", server.url()))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body, json!({ "open": false }));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_instances_sharing_a_store_see_one_room() -> Result<(), anyhow::Error> {
    let store: Arc<dyn RoomStateStore> = Arc::new(InMemoryRoomStore::new());
    let first = TestRoomServer::spawn_with_store(Arc::clone(&store)).await?;
    let second = TestRoomServer::spawn_with_store(Arc::clone(&store)).await?;
    let client = Client::new();

    let token = open_room(&client, &first, 4).await?;

    // Opening again through the other instance conflicts.
    let conflict = client
        .post(format!("{}/api/v1/room/init", second.url()))
        .json(&json!({ "passcode": TEST_PASSCODE, "size": 4 }))
        .send()
        .await?;
    assert_eq!(conflict.status(), 409);

    // The token issued by one instance is honoured by the other.
    let join = client
        .post(format!("{}/api/v1/room/join", second.url()))
        .json(&json!({ "token": token }))
        .send()
        .await?;
    assert_eq!(join.status(), 200);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_headcount_updates_from_two_instances() -> Result<(), anyhow::Error> {
    let store: Arc<dyn RoomStateStore> = Arc::new(InMemoryRoomStore::new());
    let first = TestRoomServer::spawn_with_store(Arc::clone(&store)).await?;
    let second = TestRoomServer::spawn_with_store(Arc::clone(&store)).await?;
    let client = Client::new();

    open_room(&client, &first, 10).await?;

    let (a, b) = tokio::join!(
        update_headcount(&client, &first, 3),
        update_headcount(&client, &second, 7)
    );
    assert_eq!(a?, 200);
    assert_eq!(b?, 200);

    // Last writer wins; the state is never a mix of both.
    let state = store.get_state().await?;
    assert!(state.headcount == 3 || state.headcount == 7);
    assert!(state.open);
    assert_eq!(state.limit, 10);

    // Without a competing writer each instance reads its own write back.
    for (server, value) in [(&first, 4u32), (&second, 6u32)] {
        assert_eq!(update_headcount(&client, server, value).await?, 200);
        let body: Value = client
            .get(format!("{}/api/v1/room/status", server.url()))
            .send()
            .await?
            .json()
            .await?;
        assert_eq!(body["headcount"], value);
    }

    Ok(())
}

#[tokio::test]
async fn test_store_writes_are_visible_to_every_instance() -> Result<(), anyhow::Error> {
    let store: Arc<dyn RoomStateStore> = Arc::new(InMemoryRoomStore::new());
    let first = TestRoomServer::spawn_with_store(Arc::clone(&store)).await?;
    let second = TestRoomServer::spawn_with_store(Arc::clone(&store)).await?;

    first
        .state()
        .room_service
        .open(TEST_PASSCODE, 5)
        .await?;
    assert!(second.state().room_service.is_open().await?);

    store.save_state(&RoomState::closed()).await?;
    assert!(!first.state().room_service.is_open().await?);

    Ok(())
}
