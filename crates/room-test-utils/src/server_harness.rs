//! Test server harness for E2E testing
//!
//! Provides `TestRoomServer` for spawning real room service instances in tests.

use crate::token_builders::{TEST_ADMIN_PASS, TEST_JWT_SECRET, TEST_PASSCODE};
use room_service::config::Config;
use room_service::repositories::{InMemoryRoomStore, RoomStateStore};
use room_service::routes::{self, AppState};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Base URL used for invite links built by the test server.
pub const TEST_BASE_URL: &str = "http://rooms.test";

/// Test harness for spawning the room service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_status_flow() -> Result<(), anyhow::Error> {
///     let server = TestRoomServer::spawn().await?;
///     let response = reqwest::get(format!("{}/api/v1/room/status", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestRoomServer {
    addr: SocketAddr,
    config: Config,
    state: Arc<AppState>,
    _handle: JoinHandle<()>,
}

impl TestRoomServer {
    /// Spawn a server backed by a fresh in-memory store.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_store(Arc::new(InMemoryRoomStore::new())).await
    }

    /// Spawn a server backed by `store`.
    ///
    /// Several servers may share one store to simulate a scaled-out deployment.
    pub async fn spawn_with_store(store: Arc<dyn RoomStateStore>) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(store, &[]).await
    }

    /// Spawn a server backed by `store` with extra configuration variables.
    ///
    /// The server will:
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn_with_vars(
        store: Arc<dyn RoomStateStore>,
        extra_vars: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("ROOM_BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("ROOM_PASSCODE".to_string(), TEST_PASSCODE.to_string()),
            ("ROOM_ADMIN_PASS".to_string(), TEST_ADMIN_PASS.to_string()),
            ("ROOM_JWT_SECRET".to_string(), TEST_JWT_SECRET.to_string()),
            ("ROOM_BASE_URL".to_string(), TEST_BASE_URL.to_string()),
        ]);
        for (key, value) in extra_vars {
            vars.insert((*key).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(
            AppState::new(config.clone(), store)
                .map_err(|e| anyhow::anyhow!("Failed to build app state: {}", e))?,
        );

        let app = routes::build_routes(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            state,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the application state, for direct access to the services.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Log in as admin and return the bearer token.
    pub async fn admin_token(&self, client: &reqwest::Client) -> Result<String, anyhow::Error> {
        let response = client
            .post(format!("{}/api/v1/admin/login", self.url()))
            .json(&serde_json::json!({ "password": TEST_ADMIN_PASS }))
            .send()
            .await?;
        anyhow::ensure!(
            response.status().is_success(),
            "admin login failed with status {}",
            response.status()
        );
        let body: serde_json::Value = response.json().await?;
        body["token"]
            .as_str()
            .map(ToString::to_string)
            .ok_or_else(|| anyhow::anyhow!("login response has no token"))
    }
}

impl Drop for TestRoomServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_server_spawns_successfully() -> Result<(), anyhow::Error> {
        let server = TestRoomServer::spawn().await?;

        assert!(server.url().starts_with("http://127.0.0.1:"));

        let response = reqwest::get(format!("{}/health", server.url())).await?;
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await?, "OK");

        Ok(())
    }

    #[tokio::test]
    async fn test_server_provides_addr() -> Result<(), anyhow::Error> {
        let server = TestRoomServer::spawn().await?;
        let addr = server.addr();

        assert!(addr.ip().is_loopback());
        assert!(addr.port() > 0);
        assert_eq!(server.url(), format!("http://{}", addr));
        assert_eq!(server.config().base_url, TEST_BASE_URL);

        Ok(())
    }

    #[tokio::test]
    async fn test_admin_token_helper() -> Result<(), anyhow::Error> {
        let server = TestRoomServer::spawn().await?;
        let token = server.admin_token(&reqwest::Client::new()).await?;
        assert!(!token.is_empty());
        Ok(())
    }
}
