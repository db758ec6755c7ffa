//! HTTP request handlers for the room service.

pub mod admin;
pub mod health;
pub mod room;

pub use admin::admin_login;
pub use health::{health_check, readiness_check};
pub use room::{close_room, init_room, join_room, room_status, update_headcount};

use crate::errors::RoomError;
use serde::de::DeserializeOwned;

/// Parses a JSON request body, mapping failures to `BadRequest`.
pub(crate) fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, RoomError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "room.handlers", error = %e, "Invalid request body");
        RoomError::BadRequest("Invalid JSON body".to_string())
    })
}
