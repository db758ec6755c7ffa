//! # Room Test Utilities
//!
//! Shared test utilities for the room service.
//!
//! This crate provides:
//! - Server test harness (`TestRoomServer` for E2E tests)
//! - A room store that fails on demand (`FailingStore`)
//! - Admin token builders (`TestAdminToken`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use room_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<(), anyhow::Error> {
//!     let server = TestRoomServer::spawn().await?;
//!     let client = reqwest::Client::new();
//!
//!     let response = client
//!         .get(format!("{}/health", server.url()))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod failing_store;
pub mod server_harness;
pub mod token_builders;

pub use failing_store::*;
pub use server_harness::*;
pub use token_builders::*;
