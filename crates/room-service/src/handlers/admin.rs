//! Admin login handler.

use crate::errors::RoomError;
use crate::handlers::parse_json_body;
use crate::models::{AdminLoginRequest, AdminLoginResponse};
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use common::secret::ExposeSecret;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/v1/admin/login
#[instrument(skip_all, name = "room.handlers.admin_login")]
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AdminLoginResponse>, RoomError> {
    let request: AdminLoginRequest = parse_json_body(&body)?;
    let token = state
        .admin_auth
        .login(request.password.expose_secret())?;
    Ok(Json(AdminLoginResponse { token }))
}
