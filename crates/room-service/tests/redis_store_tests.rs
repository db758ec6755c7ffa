//! Redis store and headcount relay integration tests.
//!
//! These tests need a running Redis and only run when `REDIS_URL` is set;
//! otherwise they return early. Every test uses its own key prefix and
//! channel so tests can run in parallel against one server.

use room_service::models::RoomState;
use room_service::repositories::{RedisRoomStore, RoomStateStore};
use room_service::services::RoomService;
use room_service::tasks::{HeadcountRelay, RelayBackoff};
use room_test_utils::{TestRoomServer, TEST_PASSCODE};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

static COUNTER: AtomicU32 = AtomicU32::new(0);

fn redis_url() -> Option<String> {
    std::env::var("REDIS_URL").ok().filter(|url| !url.is_empty())
}

/// Namespace unique to this test run.
fn unique_namespace(test: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("test:{test}:{}:{nanos}:{n}:", std::process::id())
}

async fn publish(url: &str, channel: &str, payload: &str) -> Result<(), anyhow::Error> {
    let client = redis::Client::open(url)?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    let _: i64 = redis::cmd("PUBLISH")
        .arg(channel)
        .arg(payload)
        .query_async(&mut conn)
        .await?;
    Ok(())
}

async fn wait_for_headcount(
    store: &dyn RoomStateStore,
    expected: u32,
) -> Result<bool, anyhow::Error> {
    for _ in 0..100 {
        if store.get_state().await?.headcount == expected {
            return Ok(true);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    Ok(false)
}

#[tokio::test]
async fn test_missing_keys_read_as_closed_room() -> Result<(), anyhow::Error> {
    let Some(url) = redis_url() else {
        return Ok(());
    };
    let store = RedisRoomStore::connect(&url, &unique_namespace("missing")).await?;

    assert_eq!(store.get_state().await?, RoomState::closed());
    store.ping().await?;

    Ok(())
}

#[tokio::test]
async fn test_save_get_and_clear() -> Result<(), anyhow::Error> {
    let Some(url) = redis_url() else {
        return Ok(());
    };
    let store = RedisRoomStore::connect(&url, &unique_namespace("roundtrip")).await?;

    let state = RoomState {
        open: true,
        invite_token: "redis-token".to_string(),
        headcount: 3,
        limit: 9,
    };
    store.save_state(&state).await?;
    assert_eq!(store.get_state().await?, state);

    store.clear().await?;
    store.clear().await?;
    assert_eq!(store.get_state().await?, RoomState::closed());

    Ok(())
}

#[tokio::test]
async fn test_key_layout() -> Result<(), anyhow::Error> {
    let Some(url) = redis_url() else {
        return Ok(());
    };
    let prefix = unique_namespace("layout");
    let store = RedisRoomStore::connect(&url, &prefix).await?;
    store
        .save_state(&RoomState::opened("layout-token".to_string(), 4))
        .await?;

    let client = redis::Client::open(url.as_str())?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    let values: (String, String, String, String) = redis::pipe()
        .get(format!("{prefix}open"))
        .get(format!("{prefix}token"))
        .get(format!("{prefix}headcount"))
        .get(format!("{prefix}limit"))
        .query_async(&mut conn)
        .await?;
    assert_eq!(
        values,
        (
            "true".to_string(),
            "layout-token".to_string(),
            "0".to_string(),
            "4".to_string()
        )
    );

    store.clear().await?;
    Ok(())
}

#[tokio::test]
async fn test_coordinator_over_redis() -> Result<(), anyhow::Error> {
    let Some(url) = redis_url() else {
        return Ok(());
    };
    let store: Arc<dyn RoomStateStore> =
        Arc::new(RedisRoomStore::connect(&url, &unique_namespace("coordinator")).await?);
    let service = RoomService::new(store, TEST_PASSCODE.into(), "http://pad.test");

    let opened = service.open(TEST_PASSCODE, 10).await?;
    assert!(opened
        .invite_url
        .ends_with(&format!("invite={}&role=agent", opened.token)));
    service.join(&opened.token).await?;
    service.update_headcount(5).await?;
    assert_eq!(service.headcount().await?, 5);
    assert_eq!(service.limit().await?, 10);

    service.close().await?;
    assert!(!service.is_open().await?);
    assert_eq!(service.invite_link().await?, "");

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_instances_over_redis() -> Result<(), anyhow::Error> {
    let Some(url) = redis_url() else {
        return Ok(());
    };
    let prefix = unique_namespace("instances");
    let first_store: Arc<dyn RoomStateStore> = Arc::new(RedisRoomStore::connect(&url, &prefix).await?);
    let second_store: Arc<dyn RoomStateStore> =
        Arc::new(RedisRoomStore::connect(&url, &prefix).await?);
    let first = TestRoomServer::spawn_with_store(Arc::clone(&first_store)).await?;
    let second = TestRoomServer::spawn_with_store(second_store).await?;

    let opened = first.state().room_service.open(TEST_PASSCODE, 10).await?;
    second.state().room_service.join(&opened.token).await?;

    let (a, b) = tokio::join!(
        first.state().room_service.update_headcount(3),
        second.state().room_service.update_headcount(7)
    );
    a?;
    b?;
    let headcount = first_store.get_state().await?.headcount;
    assert!(headcount == 3 || headcount == 7);

    for (server, value) in [(&first, 4u32), (&second, 6u32)] {
        server.state().room_service.update_headcount(value).await?;
        assert_eq!(server.state().room_service.headcount().await?, value);
    }

    first_store.clear().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_relay_applies_published_headcount() -> Result<(), anyhow::Error> {
    let Some(url) = redis_url() else {
        return Ok(());
    };
    let namespace = unique_namespace("relay");
    let channel = format!("{namespace}headcount");
    let store: Arc<dyn RoomStateStore> = Arc::new(RedisRoomStore::connect(&url, &namespace).await?);
    store
        .save_state(&RoomState::opened("relay-token".to_string(), 10))
        .await?;

    let relay = HeadcountRelay::new(
        &url,
        channel.clone(),
        Arc::clone(&store),
        RelayBackoff::new(Duration::from_millis(50), Duration::from_millis(200)),
    )?;
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(relay.run(cancel.clone()));

    // Publish until the subscription is live and the update lands.
    let mut applied = false;
    for _ in 0..20 {
        publish(&url, &channel, "6").await?;
        if wait_for_headcount(store.as_ref(), 6).await? {
            applied = true;
            break;
        }
    }
    assert!(applied, "relay never applied the published headcount");

    // Malformed payloads are discarded and the relay keeps going.
    publish(&url, &channel, "not-a-number").await?;
    publish(&url, &channel, "8").await?;
    assert!(wait_for_headcount(store.as_ref(), 8).await?);

    let state = store.get_state().await?;
    assert!(state.open);
    assert_eq!(state.invite_token, "relay-token");
    assert_eq!(state.limit, 10);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle).await??;

    store.clear().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_relay_resubscribes_after_connection_loss() -> Result<(), anyhow::Error> {
    let Some(url) = redis_url() else {
        return Ok(());
    };
    let namespace = unique_namespace("resubscribe");
    let channel = format!("{namespace}headcount");
    let store: Arc<dyn RoomStateStore> = Arc::new(RedisRoomStore::connect(&url, &namespace).await?);
    store
        .save_state(&RoomState::opened("resubscribe-token".to_string(), 10))
        .await?;

    let relay = HeadcountRelay::new(
        &url,
        channel.clone(),
        Arc::clone(&store),
        RelayBackoff::new(Duration::from_millis(50), Duration::from_millis(200)),
    )?;
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(relay.run(cancel.clone()));

    let mut subscribed = false;
    for _ in 0..20 {
        publish(&url, &channel, "2").await?;
        if wait_for_headcount(store.as_ref(), 2).await? {
            subscribed = true;
            break;
        }
    }
    assert!(subscribed, "relay never applied the first headcount");

    // Drop every pub/sub connection on the server, including the relay's.
    let client = redis::Client::open(url.as_str())?;
    let mut conn = client.get_multiplexed_async_connection().await?;
    let _: i64 = redis::cmd("CLIENT")
        .arg("KILL")
        .arg("TYPE")
        .arg("pubsub")
        .query_async(&mut conn)
        .await?;

    let mut resubscribed = false;
    for _ in 0..20 {
        publish(&url, &channel, "9").await?;
        if wait_for_headcount(store.as_ref(), 9).await? {
            resubscribed = true;
            break;
        }
    }
    assert!(resubscribed, "relay did not recover after losing its subscription");
    assert!(!handle.is_finished());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle).await??;

    store.clear().await?;
    Ok(())
}
