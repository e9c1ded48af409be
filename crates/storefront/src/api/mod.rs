//! Commerce backend REST client.
//!
//! # Architecture
//!
//! - `reqwest` for HTTP, JSON bodies and the login form
//! - The backend is the source of truth - NO local sync, direct API calls
//! - In-memory caching via `moka`, grouped by [`CacheTag`]; mutations
//!   invalidate their tag
//! - Backend errors are classified into [`ApiError`] so callers can tell
//!   "log in again" from "backend unreachable"
//!
//! # Example
//!
//! ```rust,ignore
//! use marketstall_storefront::api::{ApiClient, Authorization};
//!
//! let client = ApiClient::new(&config.api)?;
//! let login = client.login(&LoginForm::parse("shopper", "hunter22")?, false).await?;
//! let auth = login.token.bearer();
//!
//! let carts = client.list_carts(&auth, false).await?;
//! ```

mod auth;
mod cache;
mod cart;
pub mod endpoints;
mod products;
pub mod types;

pub use auth::{AccessToken, Authorization, LoginForm, LoginOutcome, Principal};
pub use cache::{CacheKey, CacheTag, CacheValue};
pub use types::*;

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

use crate::config::ApiConfig;

/// Maximum characters of a response body kept in error messages and logs.
const BODY_PREVIEW_CHARS: usize = 200;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No valid session (HTTP 401).
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    /// Authenticated but lacking a permission (HTTP 403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected, locally or by the backend (HTTP 400/422).
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Conflicting state, e.g. a duplicate entity (HTTP 409).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The backend failed (HTTP 5xx).
    #[error("Backend error {status}: {message}")]
    Server { status: u16, message: String },

    /// Any other non-success status.
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// The backend could not be reached (connect failure or timeout).
    #[error("Backend unavailable: {0}")]
    NetworkUnavailable(#[source] reqwest::Error),

    /// HTTP request failed for another reason.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configured base URL cannot address an endpoint.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Whether retrying the same request later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnavailable(_) | Self::RateLimited(_) | Self::Server { .. }
        )
    }

    /// Whether the caller must authenticate (again).
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::AuthRequired(_) | Self::Forbidden(_))
    }

    /// Human-readable message suitable for showing to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::ValidationFailed(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::RateLimited(_) => "Too many requests, please try again shortly".to_string(),
            Self::NetworkUnavailable(_) => "The store is unreachable right now".to_string(),
            _ => "Something went wrong, please try again".to_string(),
        }
    }

    /// Classify a transport-level failure.
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::NetworkUnavailable(err)
        } else {
            Self::Http(err)
        }
    }

    /// Classify a non-success response from its status and body.
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = error_message(status, body);
        match status.as_u16() {
            400 | 422 => Self::ValidationFailed(message),
            401 => Self::AuthRequired(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            code @ 500..=599 => Self::Server {
                status: code,
                message,
            },
            code => Self::UnexpectedStatus {
                status: code,
                message,
            },
        }
    }
}

/// Error body in the backend's format.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message(String),
    Validation(Vec<ValidationIssue>),
    Other(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct ValidationIssue {
    #[serde(default)]
    loc: Vec<serde_json::Value>,
    msg: String,
}

/// Extract the most useful message from an error body.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return match parsed.detail {
            ErrorDetail::Message(msg) => msg,
            ErrorDetail::Validation(issues) => issues
                .iter()
                .map(|issue| {
                    let loc = issue
                        .loc
                        .iter()
                        .map(|part| match part {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(".");
                    if loc.is_empty() {
                        issue.msg.clone()
                    } else {
                        format!("{loc}: {}", issue.msg)
                    }
                })
                .collect::<Vec<_>>()
                .join("; "),
            ErrorDetail::Other(value) => value.to_string(),
        };
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        trimmed.chars().take(BODY_PREVIEW_CHARS).collect()
    }
}

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the commerce backend.
///
/// Cheaply cloneable; clones share the connection pool and the cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<CacheKey, CacheValue>,
}

impl ApiClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ApiError::Http)?;

        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .support_invalidation_closures()
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                cache,
            }),
        })
    }

    /// The backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The underlying HTTP client.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.client
    }

    /// Absolute URL for a backend path, keeping any path prefix of the base.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}{path}"))?)
    }

    /// Send a request and classify non-success responses.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(ApiError::from_transport)?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, &body);
        if status.is_server_error() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(BODY_PREVIEW_CHARS * 2).collect::<String>(),
                "Backend returned server error"
            );
        } else {
            tracing::debug!(status = %status, error = %err, "Backend rejected request");
        }
        Err(err)
    }

    /// Send a request and parse a JSON body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        Self::read_json(response).await
    }

    /// Parse the JSON body of a successful response.
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await.map_err(ApiError::from_transport)?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %text.chars().take(BODY_PREVIEW_CHARS * 2).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    /// Evict every cached response carrying `tag`.
    pub fn invalidate(&self, tag: CacheTag) {
        if let Err(e) = self
            .inner
            .cache
            .invalidate_entries_if(move |key, _| key.tag() == tag)
        {
            tracing::warn!(?tag, error = %e, "Failed to invalidate cache tag");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classification() {
        let detail = r#"{"detail": "Not authenticated"}"#;
        assert!(matches!(
            ApiError::from_status(StatusCode::UNAUTHORIZED, detail),
            ApiError::AuthRequired(msg) if msg == "Not authenticated"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::FORBIDDEN, detail),
            ApiError::Forbidden(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(msg) if msg == "Not Found"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::CONFLICT, detail),
            ApiError::Conflict(_)
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "upstream down"),
            ApiError::Server { status: 502, message } if message == "upstream down"
        ));
        assert!(matches!(
            ApiError::from_status(StatusCode::IM_A_TEAPOT, ""),
            ApiError::UnexpectedStatus { status: 418, .. }
        ));
    }

    #[test]
    fn test_validation_detail_is_flattened() {
        let body = r#"{"detail": [
            {"loc": ["body", "name"], "msg": "String should have at least 1 character", "type": "string_too_short"},
            {"loc": ["query", "page"], "msg": "Input should be greater than 0"}
        ]}"#;
        let err = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(
            err.to_string(),
            "Validation failed: body.name: String should have at least 1 character; query.page: Input should be greater than 0"
        );
    }

    #[test]
    fn test_long_plain_body_is_truncated() {
        let body = "x".repeat(1000);
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, &body);
        assert!(matches!(err, ApiError::ValidationFailed(msg) if msg.len() == BODY_PREVIEW_CHARS));
    }

    #[test]
    fn test_transient_and_auth_flags() {
        assert!(ApiError::RateLimited(3).is_transient());
        assert!(
            ApiError::Server {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!ApiError::AuthRequired(String::new()).is_transient());
        assert!(ApiError::AuthRequired(String::new()).is_auth_failure());
        assert!(!ApiError::NotFound(String::new()).is_auth_failure());
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = ApiError::Server {
            status: 500,
            message: "Traceback (most recent call last)".to_string(),
        };
        assert!(!err.user_message().contains("Traceback"));

        let err = ApiError::ValidationFailed("Incorrect username or password".to_string());
        assert_eq!(err.user_message(), "Incorrect username or password");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = ApiConfig {
            base_url: Url::parse("http://backend.local/shop/").unwrap(),
            ..ApiConfig::default()
        };
        let client = ApiClient::new(&config).unwrap();
        let url = client.endpoint(endpoints::PRODUCTS).unwrap();
        assert_eq!(url.as_str(), "http://backend.local/shop/api/v1/product");
    }
}
