//! Common utilities and types shared across Room Gate components.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for admin JWT issuance and verification
pub mod jwt;
