//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks that the room state store answers

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler. Checks no dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 if the store answers a ping, 503 otherwise. The store error is
/// logged server-side; the response carries a generic message.
#[tracing::instrument(skip_all, name = "room.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.room_service.store();

    if let Err(e) = store.ping().await {
        tracing::warn!(
            target: "room.handlers",
            backend = store.backend_name(),
            error = %e,
            "Readiness check failed: store unavailable"
        );
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready",
                store: Some("unhealthy"),
                error: Some("Service dependencies unavailable".to_string()),
            }),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            store: Some("healthy"),
            error: None,
        }),
    )
}
