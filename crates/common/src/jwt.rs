//! Admin JWT issuance and verification.
//!
//! The room service gates privileged operations (closing the room) behind a
//! short-lived HS256 token issued on admin login. Boundary code only needs the
//! "verify token, get subject" capability, exposed as the [`TokenVerifier`]
//! trait so handlers can be tested against fakes.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only HS256 is accepted; the algorithm in the header is not trusted
//! - `exp` and `iss` are validated, `iat` may not be in the future beyond skew
//! - Generic error messages prevent information leakage
//! - The `sub` field is redacted in Debug output
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{HmacTokenAuthority, TokenVerifier, ADMIN_SUBJECT};
//!
//! let authority = HmacTokenAuthority::new(secret_bytes, Duration::from_secs(1800))?;
//! let token = authority.issue(ADMIN_SUBJECT)?;
//! assert_eq!(authority.verify(&token)?, ADMIN_SUBJECT);
//! ```

use crate::secret::{ExposeSecret, SecretBox};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Admin tokens are ~200 bytes; anything larger is rejected before decoding.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Subject carried by tokens issued on admin login.
pub const ADMIN_SUBJECT: &str = "admin";

/// Issuer claim written into and required on every token.
pub const TOKEN_ISSUER: &str = "room-service";

/// Minimum HMAC-SHA256 key length in bytes.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Clock skew tolerance for `iat` validation.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

// =============================================================================
// Error Types
// =============================================================================

/// Errors from issuing or verifying admin tokens.
///
/// Verification failures share one message so callers cannot distinguish an
/// expired token from a forged one. Details are logged at debug level.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminTokenError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Signature, structure, issuer or expiry check failed.
    #[error("The access token is invalid or expired")]
    InvalidToken,

    /// Token `iat` claim is too far in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,

    /// Signing key shorter than `MIN_SECRET_LENGTH`.
    #[error("Signing secret must be at least {MIN_SECRET_LENGTH} bytes, got {0}")]
    SecretTooShort(usize),

    /// Encoding the token failed.
    #[error("Failed to sign token")]
    Signing,
}

// =============================================================================
// Claims
// =============================================================================

/// Claims carried by admin tokens.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdminClaims {
    /// Subject - redacted in Debug output.
    pub sub: String,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: i64,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issuer, always [`TOKEN_ISSUER`] for tokens we accept.
    pub iss: String,
}

impl fmt::Debug for AdminClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminClaims")
            .field("sub", &"[REDACTED]")
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("iss", &self.iss)
            .finish()
    }
}

// =============================================================================
// Verification capability
// =============================================================================

/// Verifies a bearer credential and returns its subject.
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` and return the subject it was issued to.
    ///
    /// # Errors
    ///
    /// Returns an [`AdminTokenError`] if the token is oversized, malformed,
    /// forged, expired or issued in the future.
    fn verify(&self, token: &str) -> Result<String, AdminTokenError>;
}

/// Issues and verifies HS256 admin tokens with a shared symmetric key.
pub struct HmacTokenAuthority {
    secret: SecretBox<Vec<u8>>,
    ttl: Duration,
}

impl fmt::Debug for HmacTokenAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacTokenAuthority")
            .field("secret", &"[REDACTED]")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl HmacTokenAuthority {
    /// Create an authority from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns `AdminTokenError::SecretTooShort` if `secret` is shorter than
    /// [`MIN_SECRET_LENGTH`].
    pub fn new(secret: Vec<u8>, ttl: Duration) -> Result<Self, AdminTokenError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(AdminTokenError::SecretTooShort(secret.len()));
        }
        Ok(Self {
            secret: SecretBox::new(Box::new(secret)),
            ttl,
        })
    }

    /// Lifetime of issued tokens.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `subject` valid for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns `AdminTokenError::Signing` if encoding fails.
    pub fn issue(&self, subject: &str) -> Result<String, AdminTokenError> {
        let now = chrono::Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = AdminClaims {
            sub: subject.to_string(),
            iat: now,
            exp: now.saturating_add(ttl),
            iss: TOKEN_ISSUER.to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret()),
        )
        .map_err(|e| {
            tracing::error!(target: "common.jwt", error = %e, "Failed to sign admin token");
            AdminTokenError::Signing
        })
    }

    /// Verify `token` and return its full claims.
    ///
    /// # Errors
    ///
    /// See [`TokenVerifier::verify`].
    pub fn verify_claims(&self, token: &str) -> Result<AdminClaims, AdminTokenError> {
        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "common.jwt",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token rejected: size exceeds maximum allowed"
            );
            return Err(AdminTokenError::TokenTooLarge);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.set_issuer(&[TOKEN_ISSUER]);

        let data = decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret()),
            &validation,
        )
        .map_err(|e| {
            tracing::debug!(target: "common.jwt", error = %e, "Token verification failed");
            AdminTokenError::InvalidToken
        })?;

        validate_iat(data.claims.iat, DEFAULT_CLOCK_SKEW)?;

        Ok(data.claims)
    }
}

impl TokenVerifier for HmacTokenAuthority {
    fn verify(&self, token: &str) -> Result<String, AdminTokenError> {
        self.verify_claims(token).map(|claims| claims.sub)
    }
}

/// Reject tokens whose `iat` lies more than `clock_skew` in the future.
///
/// # Errors
///
/// Returns `AdminTokenError::IatTooFarInFuture` when the check fails.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), AdminTokenError> {
    let now = chrono::Utc::now().timestamp();
    let skew = i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX);
    if iat > now.saturating_add(skew) {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            "Token rejected: iat too far in the future"
        );
        return Err(AdminTokenError::IatTooFarInFuture);
    }
    Ok(())
}
