//! Room Gate Service Library
//!
//! Admission control for a single shared collaborative room:
//!
//! - Opening the room behind a passcode and issuing an invite token
//! - Admitting participants against the token and a headcount limit
//! - Tracking the externally reported headcount
//! - Closing the room to release the slot for the next session
//!
//! # Architecture
//!
//! Follows the Handler -> Service -> Repository pattern:
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//!                                   tasks/headcount_relay.rs ---^
//! ```
//!
//! The room state is a single value owned by a [`repositories::RoomStateStore`].
//! Two implementations exist: an in-process store guarded by a read/write lock,
//! and a Redis store shared by every instance of a scaled-out deployment. When
//! Redis is used, the headcount relay keeps every instance's view of the
//! headcount in sync via pub/sub.
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Admin authentication
//! - `models` - Room state and wire types
//! - `repositories` - Room state stores
//! - `routes` - Axum router setup
//! - `services` - Room coordinator, admin login, close notifications
//! - `tasks` - Background headcount relay

pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
