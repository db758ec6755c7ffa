//! Room handlers.
//!
//! Bodies are read as raw bytes and parsed here so malformed JSON maps to a
//! 400 with the service's error body.

use crate::errors::RoomError;
use crate::handlers::parse_json_body;
use crate::middleware::AdminSubject;
use crate::models::{
    CloseRoomResponse, InitRoomRequest, InitRoomResponse, JoinRoomRequest, JoinRoomResponse,
    RoomStatusResponse, UpdateHeadcountRequest, UpdateHeadcountResponse,
};
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::Extension;
use axum::http::header::SET_COOKIE;
use axum::response::IntoResponse;
use axum::Json;
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::{info, instrument};

/// Admission marker handed to participants after a successful join.
pub const ROOM_ACCESS_COOKIE: &str = "room_access=1; Path=/; Max-Age=86400; SameSite=Lax";

/// Handler for POST /api/v1/room/init
///
/// Opens the room and returns the invite link and raw token.
#[instrument(skip_all, name = "room.handlers.init")]
pub async fn init_room(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<InitRoomResponse>, RoomError> {
    let request: InitRoomRequest = parse_json_body(&body)?;

    let opened = state
        .room_service
        .open(request.passcode.expose_secret(), request.size)
        .await?;

    Ok(Json(InitRoomResponse {
        invite_url: opened.invite_url,
        token: opened.token,
    }))
}

/// Handler for GET /api/v1/room/status
#[instrument(skip_all, name = "room.handlers.status")]
pub async fn room_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RoomStatusResponse>, RoomError> {
    let status = state.room_service.status().await?;

    if status.open && status.invite_link.is_empty() {
        return Err(RoomError::Internal(
            "invite link is empty while room is open".to_string(),
        ));
    }

    Ok(Json(status.into()))
}

/// Handler for POST /api/v1/room/join
///
/// Sets the `room_access` cookie on success.
#[instrument(skip_all, name = "room.handlers.join")]
pub async fn join_room(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, RoomError> {
    let request: JoinRoomRequest = parse_json_body(&body)?;

    state.room_service.join(&request.token).await?;

    Ok((
        [(SET_COOKIE, ROOM_ACCESS_COOKIE)],
        Json(JoinRoomResponse { success: true }),
    ))
}

/// Handler for POST /api/v1/room/close
///
/// Admin only. Notifies the collaboration server in the background when a
/// control URL is configured.
#[instrument(skip_all, name = "room.handlers.close")]
pub async fn close_room(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AdminSubject>,
) -> Result<Json<CloseRoomResponse>, RoomError> {
    state.room_service.close().await?;
    info!(target: "room.handlers", subject = %admin.0, "Room closed by admin");

    if let Some(notifier) = &state.control_notifier {
        notifier.spawn_notify_closed();
    }

    Ok(Json(CloseRoomResponse { open: false }))
}

/// Handler for POST /api/v1/room/update-people
#[instrument(skip_all, name = "room.handlers.update_headcount")]
pub async fn update_headcount(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<UpdateHeadcountResponse>, RoomError> {
    let request: UpdateHeadcountRequest = parse_json_body(&body)?;

    let headcount = state
        .room_service
        .update_headcount(request.headcount)
        .await?;

    Ok(Json(UpdateHeadcountResponse { headcount }))
}
