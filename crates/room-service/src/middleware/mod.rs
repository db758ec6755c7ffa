//! HTTP middleware for the room service.

pub mod auth;

pub use auth::{require_admin, AdminAuthState, AdminSubject};
