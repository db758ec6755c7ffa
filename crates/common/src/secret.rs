//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for the room passcode, the admin
//! password and the admin token signing key. `SecretString` and `SecretBox<T>`
//! implement `Debug` with redaction, so structs that derive `Debug` stay safe to
//! log.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct OpenRequest {
//!     size: i64,
//!     passcode: SecretString,
//! }
//!
//! let req = OpenRequest {
//!     size: 4,
//!     passcode: SecretString::from("7777"),
//! };
//!
//! assert!(!format!("{req:?}").contains("7777"));
//! assert_eq!(req.passcode.expose_secret(), "7777");
//! ```
//!
//! Use `SecretString` for the room passcode, the admin password, bearer tokens
//! and connection URLs that may embed credentials. Use `SecretBox<T>` for binary
//! key material such as the HMAC signing key.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
use serde::{Deserialize, Deserializer};

/// Deserialize a JSON string straight into a [`SecretString`].
///
/// Use with `#[serde(deserialize_with = "common::secret::deserialize_secret_string")]`.
pub fn deserialize_secret_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Compare a supplied credential against a configured secret.
///
/// Surrounding whitespace on the supplied value is ignored; the comparison is
/// otherwise exact and case-sensitive.
#[must_use]
pub fn matches_trimmed(expected: &SecretString, supplied: &str) -> bool {
    constant_time_eq(supplied.trim(), expected.expose_secret())
}

/// Constant-time string equality for bearer secrets.
///
/// Only the length comparison short-circuits.
#[must_use]
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    ring::constant_time::verify_slices_are_equal(a.as_bytes(), b.as_bytes()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("7777");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("7777"));
    }

    #[test]
    fn test_deserialize_keeps_value_hidden() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct Login {
            #[serde(deserialize_with = "deserialize_secret_string")]
            password: SecretString,
        }

        let login: Login =
            serde_json::from_str(r#"{"password": "dashboard-pass"}"#).expect("deserialize");

        assert_eq!(login.password.expose_secret(), "dashboard-pass");
        assert!(!format!("{login:?}").contains("dashboard-pass"));
    }

    #[test]
    fn test_matches_trimmed_ignores_surrounding_whitespace() {
        let expected = SecretString::from("7777");
        assert!(matches_trimmed(&expected, "7777"));
        assert!(matches_trimmed(&expected, "  7777\n"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("invite-token", "invite-token"));
        assert!(constant_time_eq("", ""));
        assert!(!constant_time_eq("invite-token", "invite-tokeN"));
        assert!(!constant_time_eq("invite-token", "invite-token-longer"));
        assert!(!constant_time_eq("invite-token", ""));
    }

    #[test]
    fn test_matches_trimmed_is_exact() {
        let expected = SecretString::from("Secret");
        assert!(!matches_trimmed(&expected, "secret"));
        assert!(!matches_trimmed(&expected, "Secret1"));
        assert!(!matches_trimmed(&expected, "Sec ret"));
        assert!(!matches_trimmed(&expected, ""));
    }
}
