//! Service layer for the room service.
//!
//! # Components
//!
//! - `room_service` - Room lifecycle and admission rules
//! - `admin_auth` - Admin password login and token issuance
//! - `control_client` - Close notifications to the collaboration server

pub mod admin_auth;
pub mod control_client;
pub mod room_service;

pub use admin_auth::AdminAuthService;
pub use control_client::RoomControlNotifier;
pub use room_service::RoomService;
