//! Headcount relay background task.
//!
//! Subscribes to the headcount pub/sub channel and writes every update into
//! the room state store, so all instances sharing the Redis store converge on
//! the same headcount. Each message carries a decimal integer payload.
//!
//! # Resilience
//!
//! - A malformed payload is logged and discarded.
//! - A store failure while applying a message is logged; the loop moves on.
//! - A lost subscription is re-established with exponential backoff. The
//!   backoff resets once a subscription is acknowledged again.
//!
//! # Graceful Shutdown
//!
//! The task exits when its cancellation token is triggered, whether it is
//! waiting for a message or sleeping between reconnect attempts. The
//! subscription is released before returning.

use crate::errors::RoomError;
use crate::repositories::RoomStateStore;
use futures::StreamExt;
use redis::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use crate::config::DEFAULT_HEADCOUNT_CHANNEL;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Malformed headcount payload: {0:?}")]
    MalformedPayload(String),

    #[error("Store error: {0}")]
    Store(#[from] RoomError),

    #[error("Subscription error: {0}")]
    Subscription(String),
}

/// Exponential reconnect backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayBackoff {
    pub initial: Duration,
    pub max: Duration,
}

impl RelayBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Delay before reconnect attempt `attempt` (0-based): `initial * 2^attempt`,
    /// capped at `max`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.initial
            .checked_mul(factor)
            .map_or(self.max, |delay| delay.min(self.max))
    }
}

impl Default for RelayBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(30))
    }
}

/// Parses `payload` and overwrites the stored headcount with it.
///
/// Returns the applied headcount.
///
/// # Errors
///
/// - `MalformedPayload` if the payload is not a non-negative decimal integer;
///   the store is not touched
/// - `Store` if reading or writing the state fails
pub async fn apply_headcount_payload(
    store: &dyn RoomStateStore,
    payload: &str,
) -> Result<u32, RelayError> {
    let headcount: u32 = payload
        .trim()
        .parse()
        .map_err(|_| RelayError::MalformedPayload(payload.to_string()))?;

    let mut state = store.get_state().await?;
    state.headcount = headcount;
    store.save_state(&state).await?;

    Ok(headcount)
}

/// How a subscription session ended.
enum SessionEnd {
    Cancelled,
    /// The subscription was acknowledged and later lost.
    Disconnected,
}

/// Pub/sub listener feeding headcount updates into the store.
pub struct HeadcountRelay {
    client: Client,
    channel: String,
    store: Arc<dyn RoomStateStore>,
    backoff: RelayBackoff,
}

impl HeadcountRelay {
    /// Creates a relay. No connection is made until [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Subscription` if the Redis URL is invalid.
    pub fn new(
        redis_url: &str,
        channel: impl Into<String>,
        store: Arc<dyn RoomStateStore>,
        backoff: RelayBackoff,
    ) -> Result<Self, RelayError> {
        let client = Client::open(redis_url)
            .map_err(|e| RelayError::Subscription(format!("Failed to open Redis client: {e}")))?;

        Ok(Self {
            client,
            channel: channel.into(),
            store,
            backoff,
        })
    }

    /// Runs until `cancel_token` is triggered.
    #[instrument(skip_all, name = "room.task.headcount_relay", fields(channel = %self.channel))]
    pub async fn run(self, cancel_token: CancellationToken) {
        info!(target: "room.relay", channel = %self.channel, "Starting headcount relay");

        let mut attempt: u32 = 0;

        loop {
            match self.run_session(&cancel_token).await {
                Ok(SessionEnd::Cancelled) => break,
                Ok(SessionEnd::Disconnected) => {
                    attempt = 0;
                    warn!(target: "room.relay", "Headcount subscription lost");
                }
                Err(e) => {
                    warn!(
                        target: "room.relay",
                        error = %e,
                        attempt = attempt,
                        "Headcount subscription failed"
                    );
                }
            }

            let delay = self.backoff.delay_for(attempt);
            attempt = attempt.saturating_add(1);
            debug!(
                target: "room.relay",
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Reconnecting after backoff"
            );

            tokio::select! {
                () = cancel_token.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        info!(target: "room.relay", "Headcount relay received shutdown signal, exiting");
    }

    async fn run_session(&self, cancel_token: &CancellationToken) -> Result<SessionEnd, RelayError> {
        let connect = async {
            let mut pubsub = self.client.get_async_pubsub().await?;
            pubsub.subscribe(&self.channel).await?;
            Ok::<_, redis::RedisError>(pubsub)
        };

        let mut pubsub = tokio::select! {
            () = cancel_token.cancelled() => return Ok(SessionEnd::Cancelled),
            result = connect => result.map_err(|e| RelayError::Subscription(e.to_string()))?,
        };

        info!(target: "room.relay", channel = %self.channel, "Subscribed to headcount channel");

        let end = {
            let mut messages = pubsub.on_message();
            loop {
                tokio::select! {
                    () = cancel_token.cancelled() => break SessionEnd::Cancelled,
                    message = messages.next() => match message {
                        Some(message) => self.handle_message(&message).await,
                        None => break SessionEnd::Disconnected,
                    },
                }
            }
        };

        if matches!(end, SessionEnd::Cancelled) {
            if let Err(e) = pubsub.unsubscribe(&self.channel).await {
                debug!(target: "room.relay", error = %e, "Unsubscribe failed during shutdown");
            }
        }

        Ok(end)
    }

    async fn handle_message(&self, message: &redis::Msg) {
        let payload: String = match message.get_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(target: "room.relay", error = %e, "Discarding non-text headcount message");
                return;
            }
        };

        match apply_headcount_payload(self.store.as_ref(), &payload).await {
            Ok(headcount) => {
                debug!(target: "room.relay", headcount = headcount, "Applied headcount update");
            }
            Err(RelayError::MalformedPayload(raw)) => {
                warn!(target: "room.relay", payload = %raw, "Discarding malformed headcount payload");
            }
            Err(e) => {
                warn!(target: "room.relay", error = %e, "Failed to apply headcount update");
            }
        }
    }
}
