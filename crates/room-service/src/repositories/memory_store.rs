//! In-process room state store.
//!
//! Valid for a single instance only: two processes each holding an
//! `InMemoryRoomStore` see two different rooms.

use crate::errors::RoomError;
use crate::models::RoomState;
use crate::repositories::RoomStateStore;
use tokio::sync::RwLock;
use tracing::debug;

/// Room state guarded by a read/write lock.
///
/// Readers share the lock, writers are exclusive, so a reader never observes
/// fields from two different saves.
#[derive(Debug, Default)]
pub struct InMemoryRoomStore {
    state: RwLock<RoomState>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RoomStateStore for InMemoryRoomStore {
    async fn get_state(&self) -> Result<RoomState, RoomError> {
        Ok(self.state.read().await.clone())
    }

    async fn save_state(&self, state: &RoomState) -> Result<(), RoomError> {
        let mut guard = self.state.write().await;
        *guard = state.clone();
        debug!(
            target: "room.store.memory",
            open = state.open,
            headcount = state.headcount,
            limit = state.limit,
            "Saved room state"
        );
        Ok(())
    }

    async fn clear(&self) -> Result<(), RoomError> {
        *self.state.write().await = RoomState::closed();
        debug!(target: "room.store.memory", "Cleared room state");
        Ok(())
    }

    async fn ping(&self) -> Result<(), RoomError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
