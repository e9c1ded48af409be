//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARKETSTALL_API_URL` - Base URL of the commerce backend
//!
//! ## Optional
//! - `MARKETSTALL_API_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `MARKETSTALL_CACHE_TTL_SECS` - Query cache TTL (default: 300)
//! - `MARKETSTALL_CACHE_CAPACITY` - Query cache entries (default: 1000)
//! - `MARKETSTALL_CLIENT_ID` - OAuth2 client id sent with logins
//! - `MARKETSTALL_CLIENT_SECRET` - OAuth2 client secret sent with logins
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL (default: `http://localhost:3000`)
//! - `STOREFRONT_SESSION_TTL_SECS` - Session inactivity expiry (default: 86400)
//! - `CART_REMINDER_DAYS` - Reminder offset for a new default cart (default: 1)
//! - `STOREFRONT_TRUST_PROXY_HEADERS` - Key the login rate limit on
//!   `X-Forwarded-For`/`X-Real-IP` (default: false). Only enable behind a
//!   reverse proxy that overwrites these headers.
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Sessions expire after this long without a request
    pub session_ttl: Duration,
    /// Days until the reminder of a newly created default cart
    pub cart_reminder_days: u32,
    /// Whether client IPs are taken from reverse-proxy headers
    pub trust_proxy_headers: bool,
    /// Commerce backend configuration
    pub api: ApiConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Commerce backend client configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ApiConfig {
    /// Backend base URL; endpoint paths are appended to it
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// How long cached query responses live
    pub cache_ttl: Duration,
    /// Maximum cached query responses
    pub cache_capacity: u64,
    /// OAuth2 client id sent with password logins
    pub client_id: Option<String>,
    /// OAuth2 client secret sent with password logins
    pub client_secret: Option<SecretString>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_capacity", &self.cache_capacity)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::from_str("http://localhost:8000/")
                .unwrap_or_else(|_| unreachable!("static URL is valid")),
            timeout: Duration::from_secs(10),
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 1000,
            client_id: None,
            client_secret: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000");
        let session_ttl = Duration::from_secs(parse_env("STOREFRONT_SESSION_TTL_SECS", "86400")?);
        let cart_reminder_days = parse_env("CART_REMINDER_DAYS", "1")?;
        let trust_proxy_headers = parse_env("STOREFRONT_TRUST_PROXY_HEADERS", "false")?;

        let api = ApiConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");

        Ok(Self {
            host,
            port,
            base_url,
            session_ttl,
            cart_reminder_days,
            trust_proxy_headers,
            api,
            sentry_dsn,
            sentry_environment,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS (secure cookies).
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl ApiConfig {
    /// Load the backend client configuration from environment variables.
    ///
    /// Does not read `.env`; callers decide whether to.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `MARKETSTALL_API_URL` is missing or any
    /// value is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("MARKETSTALL_API_URL")?;
        let base_url = parse_value::<Url>("MARKETSTALL_API_URL", &raw_url)?;

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(parse_env("MARKETSTALL_API_TIMEOUT_SECS", "10")?),
            cache_ttl: Duration::from_secs(parse_env("MARKETSTALL_CACHE_TTL_SECS", "300")?),
            cache_capacity: parse_env("MARKETSTALL_CACHE_CAPACITY", "1000")?,
            client_id: get_optional_env("MARKETSTALL_CLIENT_ID"),
            client_secret: get_optional_env("MARKETSTALL_CLIENT_SECRET").map(SecretString::from),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_ttl: Duration::from_secs(86_400),
            cart_reminder_days: 1,
            trust_proxy_headers: false,
            api: ApiConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_secure() {
        let mut config = config();
        assert!(!config.is_secure());
        config.base_url = "https://shop.example.com".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u16>("PORT", " 8080 ").unwrap(), 8080);

        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "PORT"));

        assert!(parse_value::<Url>("MARKETSTALL_API_URL", "not a url").is_err());
    }

    #[test]
    fn test_api_config_debug_redacts_secrets() {
        let config = ApiConfig {
            client_id: Some("web-client".to_string()),
            client_secret: Some(SecretString::from("super_secret_client_secret")),
            ..ApiConfig::default()
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("web-client"));
        assert!(debug_output.contains("localhost:8000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_client_secret"));
    }
}
