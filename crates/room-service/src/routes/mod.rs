//! HTTP routes for the room service.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::errors::RoomError;
use crate::handlers;
use crate::middleware::{require_admin, AdminAuthState};
use crate::repositories::RoomStateStore;
use crate::services::{AdminAuthService, RoomControlNotifier, RoomService};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use common::jwt::HmacTokenAuthority;
use common::secret::ExposeSecret;
use std::sync::Arc;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Room lifecycle and admission.
    pub room_service: Arc<RoomService>,

    /// Admin login and token verification.
    pub admin_auth: Arc<AdminAuthService>,

    /// Close notifier; `None` when no control URL is configured.
    pub control_notifier: Option<RoomControlNotifier>,
}

impl AppState {
    /// Wires the services for `config` on top of `store`.
    ///
    /// # Errors
    ///
    /// Returns `RoomError::Internal` if the admin token signing key is
    /// rejected or the close notifier cannot be built.
    pub fn new(config: Config, store: Arc<dyn RoomStateStore>) -> Result<Self, RoomError> {
        let authority = HmacTokenAuthority::new(
            config.jwt_secret.expose_secret().as_bytes().to_vec(),
            config.admin_token_ttl(),
        )
        .map_err(|e| RoomError::Internal(format!("Invalid admin token key: {e}")))?;

        let room_service = Arc::new(RoomService::new(
            store,
            config.passcode.clone(),
            &config.base_url,
        ));
        let admin_auth = Arc::new(AdminAuthService::new(
            config.admin_pass.clone(),
            Arc::new(authority),
        ));
        let control_notifier = config
            .room_control_url
            .clone()
            .map(RoomControlNotifier::new)
            .transpose()?;

        Ok(Self {
            config,
            room_service,
            admin_auth,
            control_notifier,
        })
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health`, `/ready` - Liveness and readiness probes
/// - `/api/v1/admin/login` - Admin token issuance
/// - `/api/v1/room/*` - Room lifecycle; `close` requires an admin token
/// - TraceLayer for request logging
/// - Request timeout from configuration
pub fn build_routes(state: Arc<AppState>) -> Router {
    let admin_auth_state = Arc::new(AdminAuthState {
        verifier: state.admin_auth.verifier(),
    });
    let request_timeout = state.config.request_timeout();

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/api/v1/admin/login", post(handlers::admin_login))
        .route("/api/v1/room/init", post(handlers::init_room))
        .route("/api/v1/room/status", get(handlers::room_status))
        .route("/api/v1/room/join", post(handlers::join_room))
        .route("/api/v1/room/update-people", post(handlers::update_headcount))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/api/v1/room/close", post(handlers::close_room))
        .route_layer(middleware::from_fn_with_state(
            admin_auth_state,
            require_admin,
        ))
        .with_state(state);

    // The last layer added runs first: the timeout wraps tracing and handlers.
    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
}
