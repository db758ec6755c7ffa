//! Builder patterns for test admin tokens.

use chrono::{Duration, Utc};
use common::jwt::{AdminClaims, ADMIN_SUBJECT, TOKEN_ISSUER};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

/// Room passcode used by the test harness.
pub const TEST_PASSCODE: &str = "7777";

/// Admin password used by the test harness.
pub const TEST_ADMIN_PASS: &str = "test-admin-pass";

/// Admin token signing key used by the test harness (32 bytes).
pub const TEST_JWT_SECRET: &str = "test-room-secret-0123456789abcdef";

/// Builder for signed admin tokens.
///
/// Defaults produce a token the harness accepts; each setter breaks one
/// property.
///
/// # Example
/// ```rust,ignore
/// let expired = TestAdminToken::new().expires_in(-60).sign();
/// let visitor = TestAdminToken::new().for_subject("visitor").sign();
/// ```
pub struct TestAdminToken {
    sub: String,
    iss: String,
    iat: i64,
    exp: i64,
    secret: Vec<u8>,
}

impl TestAdminToken {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: ADMIN_SUBJECT.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(600)).timestamp(),
            secret: TEST_JWT_SECRET.as_bytes().to_vec(),
        }
    }

    /// Set the subject.
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the issuer.
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set expiration in seconds from now (negative for an expired token).
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at in seconds from now.
    pub fn issued_in(mut self, seconds: i64) -> Self {
        self.iat = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Sign with a different key.
    pub fn signed_with(mut self, secret: &[u8]) -> Self {
        self.secret = secret.to_vec();
        self
    }

    /// Sign the token with HS256.
    pub fn sign(self) -> String {
        let claims = AdminClaims {
            sub: self.sub,
            iat: self.iat,
            exp: self.exp,
            iss: self.iss,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .expect("Failed to sign test admin token")
    }
}

impl Default for TestAdminToken {
    fn default() -> Self {
        Self::new()
    }
}
