//! Room service error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Store failures are logged server-side and reported to clients with a
//! generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::jwt::AdminTokenError;
use serde::Serialize;
use thiserror::Error;

/// Room service error type.
///
/// Maps to HTTP status codes:
/// - InvalidPasscode, InvalidToken, Unauthorized: 401 Unauthorized
/// - RoomFull: 403 Forbidden
/// - AlreadyOpen, RoomNotOpen: 409 Conflict
/// - BadRequest: 400 Bad Request
/// - StoreUnavailable: 503 Service Unavailable
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Invalid passcode")]
    InvalidPasscode,

    #[error("Room already open")]
    AlreadyOpen,

    #[error("Room is not open")]
    RoomNotOpen,

    #[error("Invalid invite token")]
    InvalidToken,

    #[error("Room is full at the configured limit")]
    RoomFull,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoomError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RoomError::InvalidPasscode | RoomError::InvalidToken | RoomError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            RoomError::RoomFull => StatusCode::FORBIDDEN,
            RoomError::AlreadyOpen | RoomError::RoomNotOpen => StatusCode::CONFLICT,
            RoomError::BadRequest(_) => StatusCode::BAD_REQUEST,
            RoomError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            RoomError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code returned in the error body.
    pub fn error_code(&self) -> &'static str {
        match self {
            RoomError::InvalidPasscode => "INVALID_PASSCODE",
            RoomError::AlreadyOpen => "ALREADY_OPEN",
            RoomError::RoomNotOpen => "ROOM_NOT_OPEN",
            RoomError::InvalidToken => "INVALID_TOKEN",
            RoomError::RoomFull => "ROOM_FULL",
            RoomError::StoreUnavailable(_) => "SERVICE_UNAVAILABLE",
            RoomError::BadRequest(_) => "BAD_REQUEST",
            RoomError::Unauthorized(_) => "UNAUTHORIZED",
            RoomError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns a client-safe error message (no internal details).
    pub fn client_message(&self) -> String {
        match self {
            RoomError::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
            RoomError::Internal(_) => "An internal error occurred".to_string(),
            RoomError::BadRequest(reason) | RoomError::Unauthorized(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        match &self {
            RoomError::StoreUnavailable(err) => {
                tracing::warn!(target: "room.errors", error = %err, "Room store unavailable");
            }
            RoomError::Internal(err) => {
                tracing::error!(target: "room.errors", error = %err, "Internal error");
            }
            _ => {}
        }

        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code(),
                message: self.client_message(),
            },
        };

        let mut response = (status, Json(body)).into_response();

        if matches!(self, RoomError::Unauthorized(_)) {
            if let Ok(header_value) = "Bearer realm=\"room-service\", error=\"invalid_token\"".parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

impl From<AdminTokenError> for RoomError {
    fn from(err: AdminTokenError) -> Self {
        RoomError::Unauthorized(err.to_string())
    }
}
