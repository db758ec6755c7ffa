//! Room coordinator.
//!
//! Implements the room lifecycle on top of a [`RoomStateStore`]:
//!
//! ```text
//!            open(passcode, size)
//!   Closed ------------------------> Open
//!     ^                                |
//!     +------------- close() ----------+
//! ```
//!
//! `join` only grants admission; the headcount is driven externally through
//! `update_headcount` or the headcount relay. Every operation reads the
//! current state from the store; nothing is cached between calls. Store
//! failures are propagated without retry.

use crate::errors::RoomError;
use crate::models::{OpenedRoom, RoomState, RoomStatus, DEFAULT_ROOM_LIMIT};
use crate::repositories::RoomStateStore;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use common::secret::{constant_time_eq, matches_trimmed, SecretString};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Bytes of entropy in an invite token.
pub const INVITE_TOKEN_BYTES: usize = 24;

/// Path of the collaborative editor that invite links point at.
const INVITE_PATH: &str = "/coding";

/// Role granted to whoever follows an invite link.
const INVITE_ROLE: &str = "agent";

/// Maps a requested room size to the enforced limit.
///
/// Zero and negative sizes fall back to [`DEFAULT_ROOM_LIMIT`]. There is no
/// upper bound beyond what fits in a `u32`.
#[must_use]
pub fn resolve_limit(size: i64) -> u32 {
    if size <= 0 {
        DEFAULT_ROOM_LIMIT
    } else {
        u32::try_from(size).unwrap_or(u32::MAX)
    }
}

/// Generates a URL-safe, unpadded invite token from [`INVITE_TOKEN_BYTES`]
/// random bytes.
pub fn generate_invite_token(rng: &dyn SecureRandom) -> Result<String, RoomError> {
    let mut bytes = [0u8; INVITE_TOKEN_BYTES];
    rng.fill(&mut bytes).map_err(|e| {
        tracing::error!(target: "room.service", error = %e, "Failed to generate invite token");
        RoomError::Internal("RNG failure".to_string())
    })?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Business logic for the single room.
pub struct RoomService {
    store: Arc<dyn RoomStateStore>,
    passcode: SecretString,
    base_url: String,
    rng: SystemRandom,
}

impl RoomService {
    /// Creates a coordinator over `store`.
    ///
    /// `base_url` prefixes invite links; trailing slashes are ignored and an
    /// empty base yields relative links.
    pub fn new(store: Arc<dyn RoomStateStore>, passcode: SecretString, base_url: &str) -> Self {
        Self {
            store,
            passcode,
            base_url: base_url.trim_end_matches('/').to_string(),
            rng: SystemRandom::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn RoomStateStore> {
        &self.store
    }

    /// Opens the room.
    ///
    /// # Errors
    ///
    /// - `InvalidPasscode` if the trimmed passcode does not match exactly
    /// - `AlreadyOpen` if the stored state is already open
    /// - `StoreUnavailable` if the store cannot be read or written
    #[instrument(skip_all, fields(size = size))]
    pub async fn open(&self, passcode: &str, size: i64) -> Result<OpenedRoom, RoomError> {
        if !matches_trimmed(&self.passcode, passcode) {
            warn!(target: "room.service", "Rejected room open: invalid passcode");
            return Err(RoomError::InvalidPasscode);
        }

        let current = self.store.get_state().await?;
        if current.open {
            return Err(RoomError::AlreadyOpen);
        }

        let limit = resolve_limit(size);
        let token = generate_invite_token(&self.rng)?;

        self.store
            .save_state(&RoomState::opened(token.clone(), limit))
            .await?;

        info!(target: "room.service", limit = limit, "Room opened");

        Ok(OpenedRoom {
            invite_url: self.invite_url(&token),
            token,
        })
    }

    /// Checks whether the holder of `token` may enter the room.
    ///
    /// Does not change the headcount.
    ///
    /// # Errors
    ///
    /// - `RoomNotOpen` if the room is closed, whatever the token
    /// - `InvalidToken` if the token does not match the stored one
    /// - `RoomFull` if the headcount has reached the limit
    #[instrument(skip_all)]
    pub async fn join(&self, token: &str) -> Result<(), RoomError> {
        let state = self.store.get_state().await?;

        if !state.open {
            return Err(RoomError::RoomNotOpen);
        }

        if state.invite_token.is_empty()
            || !constant_time_eq(token.trim(), &state.invite_token)
        {
            warn!(target: "room.service", "Rejected join: invalid invite token");
            return Err(RoomError::InvalidToken);
        }

        if !state.has_capacity() {
            info!(
                target: "room.service",
                headcount = state.headcount,
                limit = state.limit,
                "Rejected join: room full"
            );
            return Err(RoomError::RoomFull);
        }

        info!(
            target: "room.service",
            headcount = state.headcount,
            limit = state.limit,
            "Join admitted"
        );
        Ok(())
    }

    /// Closes the room. Idempotent.
    #[instrument(skip_all)]
    pub async fn close(&self) -> Result<(), RoomError> {
        self.store.clear().await?;
        info!(target: "room.service", "Room closed");
        Ok(())
    }

    /// Overwrites the headcount, whether or not the room is open.
    #[instrument(skip_all, fields(headcount = count))]
    pub async fn update_headcount(&self, count: u32) -> Result<u32, RoomError> {
        let mut state = self.store.get_state().await?;
        state.headcount = count;
        self.store.save_state(&state).await?;
        Ok(count)
    }

    /// Snapshot of the room. The invite link is empty whenever the room is
    /// closed, regardless of any stale stored token, and when an open room has
    /// lost its token.
    pub async fn status(&self) -> Result<RoomStatus, RoomError> {
        let state = self.store.get_state().await?;
        Ok(RoomStatus {
            open: state.open,
            invite_link: self.link_for(&state),
            headcount: state.headcount,
            limit: state.limit,
        })
    }

    pub async fn is_open(&self) -> Result<bool, RoomError> {
        Ok(self.store.get_state().await?.open)
    }

    pub async fn invite_link(&self) -> Result<String, RoomError> {
        let state = self.store.get_state().await?;
        Ok(self.link_for(&state))
    }

    pub async fn headcount(&self) -> Result<u32, RoomError> {
        Ok(self.store.get_state().await?.headcount)
    }

    pub async fn limit(&self) -> Result<u32, RoomError> {
        Ok(self.store.get_state().await?.limit)
    }

    /// Builds the invite link for `token`.
    pub fn invite_url(&self, token: &str) -> String {
        format!(
            "{}{INVITE_PATH}?invite={token}&role={INVITE_ROLE}",
            self.base_url
        )
    }

    fn link_for(&self, state: &RoomState) -> String {
        if state.open && !state.invite_token.is_empty() {
            self.invite_url(&state.invite_token)
        } else {
            String::new()
        }
    }
}
