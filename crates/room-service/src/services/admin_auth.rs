//! Admin login.
//!
//! Exchanges the configured admin password for a short-lived HS256 token
//! with subject `admin`. The token gates closing the room.

use crate::errors::RoomError;
use common::jwt::{HmacTokenAuthority, TokenVerifier, ADMIN_SUBJECT};
use common::secret::{matches_trimmed, SecretString};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct AdminAuthService {
    admin_pass: SecretString,
    authority: Arc<HmacTokenAuthority>,
}

impl AdminAuthService {
    pub fn new(admin_pass: SecretString, authority: Arc<HmacTokenAuthority>) -> Self {
        Self {
            admin_pass,
            authority,
        }
    }

    /// Issues an admin token if `password` matches after trimming.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` on a wrong password
    /// - `Internal` if signing fails
    #[instrument(skip_all)]
    pub fn login(&self, password: &str) -> Result<String, RoomError> {
        if !matches_trimmed(&self.admin_pass, password) {
            warn!(target: "room.services.admin_auth", "Rejected admin login");
            return Err(RoomError::Unauthorized("Invalid credentials".to_string()));
        }

        let token = self.authority.issue(ADMIN_SUBJECT).map_err(|e| {
            RoomError::Internal(format!("Failed to sign admin token: {e}"))
        })?;

        info!(
            target: "room.services.admin_auth",
            ttl_seconds = self.authority.ttl().as_secs(),
            "Admin token issued"
        );
        Ok(token)
    }

    /// Verifier for tokens issued by this service.
    pub fn verifier(&self) -> Arc<dyn TokenVerifier> {
        Arc::clone(&self.authority) as Arc<dyn TokenVerifier>
    }
}
