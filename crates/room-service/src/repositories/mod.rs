//! Room state stores.
//!
//! The room state is a single value owned by a [`RoomStateStore`]. Callers
//! always receive an owned copy and write back a whole state; nothing outside
//! the store keeps a cached copy across calls.

pub mod memory_store;
pub mod redis_store;

pub use memory_store::InMemoryRoomStore;
pub use redis_store::{RedisRoomStore, RoomStateKeys};

use crate::errors::RoomError;
use crate::models::RoomState;

/// Persistence contract for the room state.
///
/// I/O failures are reported as [`RoomError::StoreUnavailable`]. Absent state
/// is never an error: it reads back as the closed room.
#[async_trait::async_trait]
pub trait RoomStateStore: Send + Sync {
    /// Returns a copy of the current state.
    async fn get_state(&self) -> Result<RoomState, RoomError>;

    /// Replaces the whole state.
    async fn save_state(&self, state: &RoomState) -> Result<(), RoomError>;

    /// Resets the state to the closed room.
    async fn clear(&self) -> Result<(), RoomError>;

    /// Checks that the backend is reachable. Used by the readiness probe.
    async fn ping(&self) -> Result<(), RoomError>;

    /// Short backend name for logs and readiness output.
    fn backend_name(&self) -> &'static str;
}
