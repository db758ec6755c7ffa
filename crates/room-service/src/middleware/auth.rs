//! Admin authentication middleware.
//!
//! Extracts the Bearer token from the Authorization header, verifies it and
//! requires the `admin` subject. The verified subject is stored in request
//! extensions as [`AdminSubject`].

use crate::errors::RoomError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use common::jwt::{TokenVerifier, ADMIN_SUBJECT};
use std::sync::Arc;
use tracing::instrument;

/// State for the admin middleware.
#[derive(Clone)]
pub struct AdminAuthState {
    pub verifier: Arc<dyn TokenVerifier>,
}

/// Subject of a verified admin token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSubject(pub String);

/// Extracts the credential from an Authorization header value.
///
/// The `Bearer` scheme is matched case-insensitively; surrounding whitespace
/// is ignored. Returns `None` for an empty credential.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let header = header.trim();
    if header.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = match header.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer ") => header.get(7..)?.trim(),
        _ => header,
    };
    (!token.is_empty()).then_some(token)
}

/// Rejects requests that do not carry a valid admin token.
///
/// # Response
///
/// - 401 with WWW-Authenticate if the header is missing, the token fails
///   verification or the subject is not `admin`
#[instrument(skip_all, name = "room.middleware.auth")]
pub async fn require_admin(
    State(state): State<Arc<AdminAuthState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, RoomError> {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer)
        .ok_or_else(|| {
            tracing::debug!(target: "room.middleware.auth", "Missing admin token");
            RoomError::Unauthorized("Admin token required".to_string())
        })?;

    let subject = state.verifier.verify(token).map_err(|e| {
        tracing::debug!(target: "room.middleware.auth", error = %e, "Admin token rejected");
        RoomError::from(e)
    })?;

    if subject != ADMIN_SUBJECT {
        tracing::warn!(target: "room.middleware.auth", "Token subject is not admin");
        return Err(RoomError::Unauthorized("Admin token required".to_string()));
    }

    req.extensions_mut().insert(AdminSubject(subject));

    Ok(next.run(req).await)
}
