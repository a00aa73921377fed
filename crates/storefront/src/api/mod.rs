//! Client for the remote bookstore REST API.
//!
//! One [`ApiClient`] exists per browser session. It owns a cookie jar (the
//! API's session and `csrftoken` cookies) and the shopper's bearer token, and
//! attaches both to every request:
//!
//! - `Authorization: Bearer <access>` whenever a token is set
//! - `X-CSRFToken: <csrftoken cookie>` on POST, PUT, PATCH and DELETE
//!
//! Resource-specific calls live in the submodules as further `impl ApiClient`
//! blocks and return typed results.

mod auth;
mod cart;
mod catalog;
mod invoices;
mod orders;
mod payment;
mod profile;
mod reviews;
mod wishlist;

pub mod types;

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;
use url::Url;

use crate::config::ApiConfig;

/// Name of the cookie the API sets for cross-site request forgery checks.
pub const CSRF_COOKIE: &str = "csrftoken";

/// Header the API expects the CSRF cookie value to be mirrored into.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Maximum characters of a response body written to logs.
const LOG_BODY_LIMIT: usize = 500;

/// Errors returned by bookstore API calls.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{message}")]
    Server { status: StatusCode, message: String },

    /// The response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The action needs a signed-in shopper and none is.
    #[error("You need to log in first.")]
    NotAuthenticated,

    /// Input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// A path could not be joined onto the API base URL.
    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Message suitable for showing to the shopper.
    ///
    /// Server and validation messages are shown verbatim; transport and
    /// decode failures get a generic notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message, .. } | Self::Validation(message) => message.clone(),
            Self::NotAuthenticated => self.to_string(),
            Self::Transport(_) | Self::Url(_) => {
                "Could not reach the bookstore. Please try again.".to_string()
            }
            Self::Decode(_) => "The bookstore sent an unexpected response.".to_string(),
        }
    }

    /// HTTP status reported by the API, if it answered.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// ApiClient
// =============================================================================

/// Per-session client for the bookstore API.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    jar: Arc<Jar>,
    base_url: Url,
    access_token: RwLock<Option<SecretString>>,
}

impl ApiClient {
    /// Create a client with an empty cookie jar and no token.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let jar = Arc::new(Jar::default());

        let mut builder = reqwest::Client::builder().cookie_provider(Arc::clone(&jar));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client: builder.build()?,
                jar,
                base_url: config.base_url.clone(),
                access_token: RwLock::new(None),
            }),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Replace (or clear) the bearer token.
    pub async fn set_access_token(&self, token: Option<SecretString>) {
        *self.inner.access_token.write().await = token;
    }

    /// Whether a bearer token is currently attached to requests.
    pub async fn has_access_token(&self) -> bool {
        self.inner.access_token.read().await.is_some()
    }

    /// Current value of the API's CSRF cookie, if it has set one.
    #[must_use]
    pub fn csrf_token(&self) -> Option<String> {
        let header = self.inner.jar.cookies(&self.inner.base_url)?;
        let cookies = header.to_str().ok()?;
        find_cookie(cookies, CSRF_COOKIE).map(str::to_owned)
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    /// Start a request with credentials attached.
    async fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let url = self.inner.base_url.join(path)?;
        let mutating = is_mutating(&method);
        let mut builder = self.inner.client.request(method, url);

        if let Some(token) = self.inner.access_token.read().await.as_ref() {
            builder = builder.bearer_auth(token.expose_secret());
        }

        if mutating && let Some(csrf) = self.csrf_token() {
            builder = builder.header(CSRF_HEADER, csrf);
        }

        Ok(builder)
    }

    /// Send a request and turn non-success statuses into [`ApiError::Server`].
    async fn send(&self, builder: RequestBuilder) -> ApiResult<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(
            status = %status,
            body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
            "Bookstore API returned non-success status"
        );

        Err(ApiError::Server {
            status,
            message: extract_error_message(status, &body),
        })
    }

    /// Send a request and decode its JSON body.
    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = self.send(builder).await?;
        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "Failed to parse bookstore API response"
            );
            ApiError::Decode(e)
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let builder = self.request(Method::GET, path).await?;
        self.execute(builder).await
    }

    async fn get_json_with<T, Q>(&self, path: &str, query: &Q) -> ApiResult<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path).await?.query(query);
        self.execute(builder).await
    }

    async fn send_json<T, B>(&self, method: Method, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(method, path).await?.json(body);
        self.execute(builder).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.send_json(Method::POST, path, body).await
    }

    /// POST whose response body is irrelevant.
    async fn post_discard<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<()> {
        let builder = self.request(Method::POST, path).await?.json(body);
        self.send(builder).await.map(drop)
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        let builder = self.request(Method::DELETE, path).await?;
        self.send(builder).await.map(drop)
    }

    /// Prime the CSRF cookie so later mutations can mirror it.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn prime_csrf(&self) -> ApiResult<()> {
        let builder = self.request(Method::GET, "/api/csrf/").await?;
        self.send(builder).await.map(drop)
    }
}

/// Whether the API requires the CSRF header for this method.
fn is_mutating(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Find a cookie value in a `Cookie` header string (`a=1; b=2`).
fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// Pull a human-readable message out of an API error body.
///
/// Checks `error`, `detail` and `message` keys first, then the first field
/// error of a validation payload (`{"email": ["Enter a valid email."]}`).
fn extract_error_message(status: StatusCode, body: &str) -> String {
    let fallback = || format!("Request failed ({status})");

    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        let trimmed = body.trim();
        return if trimmed.is_empty() || trimmed.starts_with('<') {
            fallback()
        } else {
            trimmed.chars().take(200).collect()
        };
    };

    match &value {
        serde_json::Value::Object(map) => {
            for key in ["error", "detail", "message"] {
                if let Some(message) = map.get(key).and_then(first_string) {
                    return message;
                }
            }
            map.values().find_map(first_string).unwrap_or_else(fallback)
        }
        other => first_string(other).unwrap_or_else(fallback),
    }
}

fn first_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => items.iter().find_map(first_string),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_key() {
        let msg = extract_error_message(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Not enough stock available for this product."}"#,
        );
        assert_eq!(msg, "Not enough stock available for this product.");
    }

    #[test]
    fn test_extract_detail_key() {
        let msg = extract_error_message(
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "Given token not valid for any token type"}"#,
        );
        assert_eq!(msg, "Given token not valid for any token type");
    }

    #[test]
    fn test_extract_first_field_error() {
        let msg = extract_error_message(
            StatusCode::BAD_REQUEST,
            r#"{"email": ["Enter a valid email address."]}"#,
        );
        assert_eq!(msg, "Enter a valid email address.");
    }

    #[test]
    fn test_extract_falls_back_to_status() {
        let msg = extract_error_message(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert_eq!(msg, "Request failed (502 Bad Gateway)");

        let msg = extract_error_message(StatusCode::NOT_FOUND, "{}");
        assert_eq!(msg, "Request failed (404 Not Found)");
    }

    #[test]
    fn test_find_cookie() {
        let header = "sessionid=abc; csrftoken=tok123; other=x";
        assert_eq!(find_cookie(header, CSRF_COOKIE), Some("tok123"));
        assert_eq!(find_cookie("sessionid=abc", CSRF_COOKIE), None);
        assert_eq!(find_cookie("csrftoken=", CSRF_COOKIE), None);
    }

    #[test]
    fn test_mutating_methods() {
        assert!(is_mutating(&Method::POST));
        assert!(is_mutating(&Method::PATCH));
        assert!(is_mutating(&Method::DELETE));
        assert!(!is_mutating(&Method::GET));
    }

    #[test]
    fn test_csrf_token_read_from_jar() {
        let client = ApiClient::new(&ApiConfig {
            base_url: Url::parse("http://127.0.0.1:8000").unwrap(),
            timeout: None,
        })
        .unwrap();
        assert_eq!(client.csrf_token(), None);

        client
            .inner
            .jar
            .add_cookie_str("csrftoken=abc123; Path=/", client.base_url());
        assert_eq!(client.csrf_token().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_user_message_hides_transport_details() {
        let err = ApiError::Validation("Rate must be between 0 and 1".to_string());
        assert_eq!(err.user_message(), "Rate must be between 0 and 1");

        let err = ApiError::Server {
            status: StatusCode::BAD_REQUEST,
            message: "Card expired".to_string(),
        };
        assert_eq!(err.user_message(), "Card expired");
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }
}
