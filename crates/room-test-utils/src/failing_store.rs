//! Room store wrapper that fails on demand.

use room_service::errors::RoomError;
use room_service::models::RoomState;
use room_service::repositories::{InMemoryRoomStore, RoomStateStore};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory store whose reads and writes can be switched to fail with
/// `RoomError::StoreUnavailable`.
///
/// # Example
/// ```rust,ignore
/// let store = Arc::new(FailingStore::new());
/// store.fail_writes(true);
/// assert!(store.save_state(&RoomState::closed()).await.is_err());
/// ```
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: InMemoryRoomStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    saves: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `get_state` and `ping` fail.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make `save_state` and `clear` fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Fail every operation.
    pub fn fail_all(&self, fail: bool) {
        self.fail_reads(fail);
        self.fail_writes(fail);
    }

    /// Number of successful `save_state` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn check(flag: &AtomicBool, op: &str) -> Result<(), RoomError> {
        if flag.load(Ordering::SeqCst) {
            Err(RoomError::StoreUnavailable(format!(
                "injected {op} failure"
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl RoomStateStore for FailingStore {
    async fn get_state(&self) -> Result<RoomState, RoomError> {
        Self::check(&self.fail_reads, "read")?;
        self.inner.get_state().await
    }

    async fn save_state(&self, state: &RoomState) -> Result<(), RoomError> {
        Self::check(&self.fail_writes, "write")?;
        self.inner.save_state(state).await?;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), RoomError> {
        Self::check(&self.fail_writes, "clear")?;
        self.inner.clear().await
    }

    async fn ping(&self) -> Result<(), RoomError> {
        Self::check(&self.fail_reads, "ping")
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}
