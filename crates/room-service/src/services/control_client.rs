//! Close notifications to the collaboration server.
//!
//! When the room closes, the collaboration server is told to tear down its
//! shared document so connected clients are informed. Delivery is best
//! effort: failures are logged and never surface to the caller of `close`.

use crate::errors::RoomError;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Name of the collaborative document backing the room.
pub const COLLABORATION_ROOM_NAME: &str = "default-codepad-room";

/// Request timeout for close notifications.
const NOTIFY_TIMEOUT_SECS: u64 = 5;

/// Connect timeout for close notifications.
const NOTIFY_CONNECT_TIMEOUT_SECS: u64 = 2;

#[derive(Debug, Serialize)]
struct CloseNotification<'a> {
    room: &'a str,
}

/// HTTP client for the collaboration server's close endpoint.
#[derive(Clone)]
pub struct RoomControlNotifier {
    client: Client,
    url: String,
}

impl RoomControlNotifier {
    /// Creates a notifier posting to `url`.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Internal` if the HTTP client cannot be built.
    pub fn new(url: String) -> Result<Self, RoomError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(NOTIFY_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(NOTIFY_CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                error!(target: "room.services.control", error = %e, "Failed to build HTTP client");
                RoomError::Internal(format!("Failed to build HTTP client: {e}"))
            })?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts the close notification and waits for the response.
    #[instrument(skip_all)]
    pub async fn notify_closed(&self) -> Result<(), RoomError> {
        let response = self
            .client
            .post(&self.url)
            .json(&CloseNotification {
                room: COLLABORATION_ROOM_NAME,
            })
            .send()
            .await
            .map_err(|e| {
                RoomError::Internal(format!("Close notification request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoomError::Internal(format!(
                "Close notification rejected with status {status}"
            )));
        }

        debug!(target: "room.services.control", "Close notification delivered");
        Ok(())
    }

    /// Sends the close notification on a detached task.
    pub fn spawn_notify_closed(&self) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.notify_closed().await {
                warn!(
                    target: "room.services.control",
                    error = %e,
                    "Failed to notify collaboration server of room close"
                );
            }
        });
    }
}
