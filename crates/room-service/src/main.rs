//! Room Gate Service
//!
//! HTTP service guarding a single shared collaborative room.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Build the room state store (in-process, or Redis with a connection check)
//! 3. Wire the room, admin and notification services
//! 4. Spawn the headcount relay (Redis backend only)
//! 5. Serve HTTP until Ctrl+C or SIGTERM
//! 6. Cancel the relay and wait for it to release its subscription

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use common::secret::ExposeSecret;
use room_service::config::{Config, StoreBackend};
use room_service::repositories::{InMemoryRoomStore, RedisRoomStore, RoomStateStore};
use room_service::routes::{self, AppState};
use room_service::tasks::{HeadcountRelay, RelayBackoff};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Upper bound on waiting for the relay to exit after shutdown.
const RELAY_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "room_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Room Gate Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        store_backend = ?config.store_backend,
        headcount_channel = %config.headcount_channel,
        close_notifications = config.room_control_url.is_some(),
        "Configuration loaded successfully"
    );

    let shutdown_token = CancellationToken::new();

    let (store, relay): (Arc<dyn RoomStateStore>, Option<HeadcountRelay>) =
        match config.store_backend {
            StoreBackend::Memory => {
                info!("Using in-process room store");
                (Arc::new(InMemoryRoomStore::new()), None)
            }
            StoreBackend::Redis => {
                let redis_url = config
                    .redis_url
                    .as_ref()
                    .ok_or("REDIS_URL is required for the redis backend")?;

                info!("Connecting to Redis...");
                let store: Arc<dyn RoomStateStore> = Arc::new(
                    RedisRoomStore::connect(redis_url.expose_secret(), &config.redis_key_prefix)
                        .await
                        .map_err(|e| {
                            error!(error = %e, "Failed to connect to Redis");
                            e
                        })?,
                );
                info!("Redis connection established");

                let relay = HeadcountRelay::new(
                    redis_url.expose_secret(),
                    config.headcount_channel.clone(),
                    Arc::clone(&store),
                    RelayBackoff::new(
                        Duration::from_millis(config.relay_backoff_initial_ms),
                        Duration::from_millis(config.relay_backoff_max_ms),
                    ),
                )?;
                (store, Some(relay))
            }
        };

    let relay_handle = relay.map(|relay| tokio::spawn(relay.run(shutdown_token.child_token())));

    let bind_address: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        format!("Invalid bind address: {e}")
    })?;

    let state = Arc::new(AppState::new(config, store)?);
    let app = routes::build_routes(state);

    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| {
            error!("Failed to bind to address: {}", e);
            e
        })?;

    info!("Room Gate Service listening on {}", bind_address);

    let server_token = shutdown_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            info!("Shutdown signal received");
            server_token.cancel();
        })
        .await
        .map_err(|e| {
            error!("Server error: {}", e);
            e
        })?;

    shutdown_token.cancel();

    if let Some(handle) = relay_handle {
        match tokio::time::timeout(RELAY_SHUTDOWN_TIMEOUT, handle).await {
            Ok(Ok(())) => info!("Headcount relay stopped"),
            Ok(Err(e)) => warn!(error = %e, "Headcount relay task failed"),
            Err(_) => warn!("Headcount relay did not stop in time"),
        }
    }

    info!("Room Gate Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
