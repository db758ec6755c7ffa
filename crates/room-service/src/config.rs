//! Room service configuration.
//!
//! Configuration is loaded from environment variables. All sensitive
//! fields are redacted in Debug output.

use common::jwt::MIN_SECRET_LENGTH;
use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default Redis key namespace for the room state entries.
pub const DEFAULT_REDIS_KEY_PREFIX: &str = "room:state:";

/// Default pub/sub channel carrying headcount updates.
pub const DEFAULT_HEADCOUNT_CHANNEL: &str = "room:headcount";

/// Default admin token lifetime in seconds.
pub const DEFAULT_ADMIN_TOKEN_TTL_SECONDS: u64 = 1800;

/// Default initial relay reconnect delay in milliseconds.
pub const DEFAULT_RELAY_BACKOFF_INITIAL_MS: u64 = 500;

/// Default ceiling for the relay reconnect delay in milliseconds.
pub const DEFAULT_RELAY_BACKOFF_MAX_MS: u64 = 30_000;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Which room state store backs this instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// In-process store; valid for a single instance only.
    Memory,
    /// Redis store shared by all instances, with the headcount relay enabled.
    Redis,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(ConfigError::InvalidValue(format!(
                "ROOM_STORE_BACKEND must be 'memory' or 'redis', got '{other}'"
            ))),
        }
    }
}

/// Room service configuration.
///
/// Loaded from environment variables with sensible defaults.
/// Sensitive fields are redacted in Debug output.
#[derive(Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Passcode required to open the room.
    pub passcode: SecretString,

    /// Base URL used to build invite links (default: empty, i.e. relative).
    pub base_url: String,

    /// Password exchanged for an admin token on login.
    pub admin_pass: SecretString,

    /// HS256 signing key for admin tokens (at least 32 bytes).
    pub jwt_secret: SecretString,

    /// Admin token lifetime in seconds (default: 1800).
    pub admin_token_ttl_seconds: u64,

    /// Room state store backend (default: memory).
    pub store_backend: StoreBackend,

    /// Redis connection URL; present when the backend is Redis.
    /// Protected by `SecretString` because it may embed credentials.
    pub redis_url: Option<SecretString>,

    /// Namespace for the four room state keys (default: "room:state:").
    pub redis_key_prefix: String,

    /// Headcount pub/sub channel (default: "room:headcount").
    pub headcount_channel: String,

    /// First relay reconnect delay in milliseconds (default: 500).
    pub relay_backoff_initial_ms: u64,

    /// Relay reconnect delay ceiling in milliseconds (default: 30000).
    pub relay_backoff_max_ms: u64,

    /// Collaboration server endpoint notified when the room closes.
    pub room_control_url: Option<String>,

    /// Per-request timeout in seconds (default: 30).
    pub request_timeout_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_address", &self.bind_address)
            .field("passcode", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("admin_pass", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("admin_token_ttl_seconds", &self.admin_token_ttl_seconds)
            .field("store_backend", &self.store_backend)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "[REDACTED]"))
            .field("redis_key_prefix", &self.redis_key_prefix)
            .field("headcount_channel", &self.headcount_channel)
            .field("relay_backoff_initial_ms", &self.relay_backoff_initial_ms)
            .field("relay_backoff_max_ms", &self.relay_backoff_max_ms)
            .field("room_control_url", &self.room_control_url)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let passcode = SecretString::from(required(vars, "ROOM_PASSCODE")?.trim().to_string());
        if passcode.expose_secret().is_empty() {
            return Err(ConfigError::InvalidValue(
                "ROOM_PASSCODE must not be blank".to_string(),
            ));
        }

        let admin_pass =
            SecretString::from(required(vars, "ROOM_ADMIN_PASS")?.trim().to_string());
        if admin_pass.expose_secret().is_empty() {
            return Err(ConfigError::InvalidValue(
                "ROOM_ADMIN_PASS must not be blank".to_string(),
            ));
        }

        let jwt_secret = SecretString::from(required(vars, "ROOM_JWT_SECRET")?.as_str());
        if jwt_secret.expose_secret().len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "ROOM_JWT_SECRET must be at least {MIN_SECRET_LENGTH} bytes"
            )));
        }

        let bind_address = vars
            .get("ROOM_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let base_url = vars
            .get("ROOM_BASE_URL")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let admin_token_ttl_seconds = parse_positive(
            vars,
            "ROOM_ADMIN_TOKEN_TTL_SECONDS",
            DEFAULT_ADMIN_TOKEN_TTL_SECONDS,
        )?;

        let store_backend = match vars.get("ROOM_STORE_BACKEND") {
            Some(value) => value.parse()?,
            None => StoreBackend::Memory,
        };

        let redis_url = match store_backend {
            StoreBackend::Redis => Some(SecretString::from(required(vars, "REDIS_URL")?.as_str())),
            StoreBackend::Memory => vars.get("REDIS_URL").cloned().map(SecretString::from),
        };

        let redis_key_prefix = vars
            .get("ROOM_REDIS_KEY_PREFIX")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_string());

        let headcount_channel = vars
            .get("ROOM_HEADCOUNT_CHANNEL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEADCOUNT_CHANNEL.to_string());
        if headcount_channel.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "ROOM_HEADCOUNT_CHANNEL must not be blank".to_string(),
            ));
        }

        let relay_backoff_initial_ms = parse_positive(
            vars,
            "ROOM_RELAY_BACKOFF_INITIAL_MS",
            DEFAULT_RELAY_BACKOFF_INITIAL_MS,
        )?;
        let relay_backoff_max_ms =
            parse_positive(vars, "ROOM_RELAY_BACKOFF_MAX_MS", DEFAULT_RELAY_BACKOFF_MAX_MS)?;
        if relay_backoff_max_ms < relay_backoff_initial_ms {
            return Err(ConfigError::InvalidValue(format!(
                "ROOM_RELAY_BACKOFF_MAX_MS ({relay_backoff_max_ms}) must be >= \
                 ROOM_RELAY_BACKOFF_INITIAL_MS ({relay_backoff_initial_ms})"
            )));
        }

        let room_control_url = vars
            .get("ROOM_CONTROL_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let request_timeout_seconds = parse_positive(
            vars,
            "ROOM_REQUEST_TIMEOUT_SECONDS",
            DEFAULT_REQUEST_TIMEOUT_SECONDS,
        )?;

        Ok(Config {
            bind_address,
            passcode,
            base_url,
            admin_pass,
            jwt_secret,
            admin_token_ttl_seconds,
            store_backend,
            redis_url,
            redis_key_prefix,
            headcount_channel,
            relay_backoff_initial_ms,
            relay_backoff_max_ms,
            room_control_url,
            request_timeout_seconds,
        })
    }

    pub fn admin_token_ttl(&self) -> Duration {
        Duration::from_secs(self.admin_token_ttl_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn required<'a>(vars: &'a HashMap<String, String>, key: &str) -> Result<&'a String, ConfigError> {
    vars.get(key)
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_positive(
    vars: &HashMap<String, String>,
    key: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(value_str) = vars.get(key) else {
        return Ok(default);
    };

    let value: u64 = value_str.trim().parse().map_err(|e| {
        ConfigError::InvalidValue(format!(
            "{key} must be a positive integer, got '{value_str}': {e}"
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidValue(format!(
            "{key} must be greater than 0"
        )));
    }

    Ok(value)
}
