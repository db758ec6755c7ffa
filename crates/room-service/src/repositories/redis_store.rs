//! Redis-backed room state store.
//!
//! Shared by every instance of a scaled-out deployment.
//!
//! # Key Layout
//!
//! Four independent string keys under a common prefix (default `room:state:`):
//!
//! - `{prefix}open` - `"true"` or `"false"`
//! - `{prefix}token` - raw invite token
//! - `{prefix}headcount` - decimal headcount
//! - `{prefix}limit` - decimal limit
//!
//! Keys carry no expiry and are deleted on clear. A missing key reads back as
//! the corresponding zero value, so a cleared room is indistinguishable from
//! one that was never opened.
//!
//! # Consistency
//!
//! Each read and each write is sent as a MULTI/EXEC pipeline, so a single
//! `get_state` never observes fields from two different `save_state` calls.
//! The read-modify-write cycle of a caller is NOT isolated: two instances that
//! read, modify and save concurrently can still lose one of the updates.
//!
//! # Connection Pattern
//!
//! `MultiplexedConnection` is cheap to clone and safe for concurrent use, so
//! each operation clones it rather than sharing it behind a lock.

use crate::errors::RoomError;
use crate::models::RoomState;
use crate::repositories::RoomStateStore;
use redis::aio::MultiplexedConnection;
use redis::Client;
use tracing::{debug, error, instrument, warn};

/// Default key namespace.
pub const DEFAULT_KEY_PREFIX: &str = "room:state:";

/// The four keys holding the room state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomStateKeys {
    pub open: String,
    pub token: String,
    pub headcount: String,
    pub limit: String,
}

impl RoomStateKeys {
    pub fn new(prefix: &str) -> Self {
        Self {
            open: format!("{prefix}open"),
            token: format!("{prefix}token"),
            headcount: format!("{prefix}headcount"),
            limit: format!("{prefix}limit"),
        }
    }

    /// All keys, in the order they are read.
    pub fn all(&self) -> [&str; 4] {
        [&self.open, &self.token, &self.headcount, &self.limit]
    }
}

impl Default for RoomStateKeys {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX)
    }
}

/// Rebuilds a [`RoomState`] from the raw values of the four keys.
///
/// Missing values become zero values. Unparseable numbers are treated as zero
/// and logged; an open flag other than `"true"` reads as closed.
pub fn decode_state(
    open: Option<String>,
    token: Option<String>,
    headcount: Option<String>,
    limit: Option<String>,
) -> RoomState {
    RoomState {
        open: open.as_deref() == Some("true"),
        invite_token: token.unwrap_or_default(),
        headcount: decode_count("headcount", headcount.as_deref()),
        limit: decode_count("limit", limit.as_deref()),
    }
}

fn decode_count(field: &'static str, raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return 0;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(
            target: "room.store.redis",
            field = field,
            value = %raw,
            "Ignoring unparseable stored count"
        );
        0
    })
}

/// Room state store backed by Redis.
#[derive(Clone)]
pub struct RedisRoomStore {
    connection: MultiplexedConnection,
    keys: RoomStateKeys,
}

impl RedisRoomStore {
    /// Connects to Redis and verifies the connection.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::StoreUnavailable` if the client cannot be created
    /// or the first connection fails.
    pub async fn connect(redis_url: &str, key_prefix: &str) -> Result<Self, RoomError> {
        let client = Client::open(redis_url).map_err(|e| {
            // The URL is not logged; it may carry credentials.
            error!(target: "room.store.redis", error = %e, "Failed to open Redis client");
            RoomError::StoreUnavailable(format!("Failed to open Redis client: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(target: "room.store.redis", error = %e, "Failed to connect to Redis");
                RoomError::StoreUnavailable(format!("Failed to connect to Redis: {e}"))
            })?;

        Ok(Self::with_connection(connection, key_prefix))
    }

    /// Wraps an existing connection.
    pub fn with_connection(connection: MultiplexedConnection, key_prefix: &str) -> Self {
        Self {
            connection,
            keys: RoomStateKeys::new(key_prefix),
        }
    }
}

#[async_trait::async_trait]
impl RoomStateStore for RedisRoomStore {
    #[instrument(skip_all)]
    async fn get_state(&self) -> Result<RoomState, RoomError> {
        let mut conn = self.connection.clone();

        let (open, token, headcount, limit): (
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
        ) = redis::pipe()
            .atomic()
            .get(&self.keys.open)
            .get(&self.keys.token)
            .get(&self.keys.headcount)
            .get(&self.keys.limit)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "room.store.redis", error = %e, "Failed to read room state");
                RoomError::StoreUnavailable(format!("Failed to read room state: {e}"))
            })?;

        Ok(decode_state(open, token, headcount, limit))
    }

    #[instrument(skip_all, fields(open = state.open, headcount = state.headcount))]
    async fn save_state(&self, state: &RoomState) -> Result<(), RoomError> {
        let mut conn = self.connection.clone();
        let open = if state.open { "true" } else { "false" };

        let _: () = redis::pipe()
            .atomic()
            .set(&self.keys.open, open)
            .ignore()
            .set(&self.keys.token, &state.invite_token)
            .ignore()
            .set(&self.keys.headcount, state.headcount)
            .ignore()
            .set(&self.keys.limit, state.limit)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "room.store.redis", error = %e, "Failed to save room state");
                RoomError::StoreUnavailable(format!("Failed to save room state: {e}"))
            })?;

        debug!(
            target: "room.store.redis",
            open = state.open,
            headcount = state.headcount,
            limit = state.limit,
            "Saved room state"
        );
        Ok(())
    }

    #[instrument(skip_all)]
    async fn clear(&self) -> Result<(), RoomError> {
        let mut conn = self.connection.clone();

        let _: () = redis::cmd("DEL")
            .arg(self.keys.all().as_slice())
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                warn!(target: "room.store.redis", error = %e, "Failed to clear room state");
                RoomError::StoreUnavailable(format!("Failed to clear room state: {e}"))
            })?;

        debug!(target: "room.store.redis", "Cleared room state");
        Ok(())
    }

    async fn ping(&self) -> Result<(), RoomError> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| RoomError::StoreUnavailable(format!("Redis ping failed: {e}")))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
