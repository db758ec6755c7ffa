//! Room state and HTTP wire types.

use common::secret::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Limit applied when a room is opened with a non-positive size.
pub const DEFAULT_ROOM_LIMIT: u32 = 2;

/// The single persisted room entity.
///
/// `invite_token` is non-empty exactly when `open` is true, and `headcount`
/// and `limit` are zero while the room is closed. The zero value (`Default`)
/// is the closed room.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct RoomState {
    /// Whether the room currently accepts joins.
    pub open: bool,

    /// Bearer credential for joining. Redacted in Debug output.
    pub invite_token: String,

    /// Externally reported participant count.
    pub headcount: u32,

    /// Maximum permitted headcount.
    pub limit: u32,
}

impl RoomState {
    /// The closed room.
    #[must_use]
    pub fn closed() -> Self {
        Self::default()
    }

    /// A freshly opened room with no participants.
    #[must_use]
    pub fn opened(invite_token: String, limit: u32) -> Self {
        Self {
            open: true,
            invite_token,
            headcount: 0,
            limit,
        }
    }

    /// Whether another participant fits under the limit.
    #[must_use]
    pub fn has_capacity(&self) -> bool {
        self.headcount < self.limit
    }
}

impl fmt::Debug for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.invite_token.is_empty() {
            ""
        } else {
            "[REDACTED]"
        };
        f.debug_struct("RoomState")
            .field("open", &self.open)
            .field("invite_token", &token)
            .field("headcount", &self.headcount)
            .field("limit", &self.limit)
            .finish()
    }
}

/// Result of successfully opening the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedRoom {
    pub invite_url: String,
    pub token: String,
}

/// Snapshot of the room as reported to clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomStatus {
    pub open: bool,
    /// Empty whenever the room is closed.
    pub invite_link: String,
    pub headcount: u32,
    pub limit: u32,
}

// ============================================================================
// Request / response bodies
// ============================================================================

/// Body of `POST /api/v1/room/init`.
#[derive(Debug, Deserialize)]
pub struct InitRoomRequest {
    #[serde(deserialize_with = "common::secret::deserialize_secret_string")]
    pub passcode: SecretString,

    /// Requested capacity; zero, negative or missing means the default.
    #[serde(default)]
    pub size: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRoomResponse {
    pub invite_url: String,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStatusResponse {
    pub open: bool,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub invite_link: String,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub headcount: u32,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub limit: u32,
}

impl From<RoomStatus> for RoomStatusResponse {
    fn from(status: RoomStatus) -> Self {
        Self {
            open: status.open,
            invite_link: status.invite_link,
            headcount: status.headcount,
            limit: status.limit,
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde skip_serializing_if passes by reference
fn is_zero(value: &u32) -> bool {
    *value == 0
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub success: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloseRoomResponse {
    pub open: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateHeadcountRequest {
    pub headcount: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateHeadcountResponse {
    pub headcount: u32,
}

#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    #[serde(deserialize_with = "common::secret::deserialize_secret_string")]
    pub password: SecretString,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    pub token: String,
}

/// Readiness probe body.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<&'static str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
