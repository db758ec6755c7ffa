//! Background tasks for the room service.
//!
//! # Tasks
//!
//! - `headcount_relay` - Applies pub/sub headcount updates to the shared store

pub mod headcount_relay;

pub use headcount_relay::{apply_headcount_payload, HeadcountRelay, RelayBackoff, RelayError};
