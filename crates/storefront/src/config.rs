//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (`https://` enables secure cookies)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `BINDERY_API_URL` - Bookstore API base URL (default: <http://127.0.0.1:8000>)
//! - `BINDERY_API_TIMEOUT_SECS` - Per-request timeout (default: none)
//! - `CHECKOUT_REDIRECT_SECS` - Delay before leaving the checkout success page (default: 2)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const DEFAULT_CHECKOUT_REDIRECT_SECS: u64 = 2;

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
    /// Remote bookstore API configuration
    pub api: ApiConfig,
    /// Seconds the checkout success page waits before moving on
    pub checkout_redirect_secs: u64,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Remote bookstore API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every API path is joined onto
    pub base_url: Url,
    /// Per-request timeout; `None` leaves requests unbounded
    pub timeout: Option<Duration>,
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

        let host = parse_env_or_default("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        let api = ApiConfig::from_env()?;
        let checkout_redirect_secs = parse_env_or_default(
            "CHECKOUT_REDIRECT_SECS",
            &DEFAULT_CHECKOUT_REDIRECT_SECS.to_string(),
        )?;

        Ok(Self {
            host,
            port,
            base_url,
            api,
            checkout_redirect_secs,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env_or_default("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env_or_default("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies must carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.base_url.starts_with("https://")
    }

    /// Configuration for tests and local tooling: listens on an ephemeral
    /// loopback port and talks to the given API.
    #[must_use]
    pub fn for_api(api_base_url: Url) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            base_url: "http://127.0.0.1".to_string(),
            api: ApiConfig {
                base_url: api_base_url,
                timeout: None,
            },
            checkout_redirect_secs: DEFAULT_CHECKOUT_REDIRECT_SECS,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw = get_env_or_default("BINDERY_API_URL", DEFAULT_API_URL);
        let base_url = Url::parse(&raw).map_err(|e| {
            ConfigError::InvalidEnvVar("BINDERY_API_URL".to_string(), e.to_string())
        })?;

        let timeout = parse_optional_env::<u64>("BINDERY_API_TIMEOUT_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        Ok(Self { base_url, timeout })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env_or_default(key, default))
}

/// Parse an optional environment variable.
fn parse_optional_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key)
        .map(|value| parse_value(key, &value))
        .transpose()
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_valid() {
        let port: u16 = parse_value("TEST_PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_parse_value_invalid_names_variable() {
        let err = parse_value::<u16>("TEST_PORT", "eighty").unwrap_err();
        match err {
            ConfigError::InvalidEnvVar(key, _) => assert_eq!(key, "TEST_PORT"),
            ConfigError::MissingEnvVar(_) => panic!("expected InvalidEnvVar"),
        }
    }

    #[test]
    fn test_default_api_url_parses() {
        let url = Url::parse(DEFAULT_API_URL).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/");
    }

    #[test]
    fn test_socket_addr() {
        let mut config = StorefrontConfig::for_api(Url::parse("http://localhost:8000").unwrap());
        config.port = 3000;

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_secure_cookies_follow_scheme() {
        let mut config = StorefrontConfig::for_api(Url::parse("http://localhost:8000").unwrap());
        assert!(!config.secure_cookies());

        config.base_url = "https://books.example.com".to_string();
        assert!(config.secure_cookies());
    }
}
