//! Authentication against the backend: login, current user, logout.

use core::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use reqwest::RequestBuilder;
use reqwest::header::{COOKIE, SET_COOKIE};
use secrecy::{ExposeSecret, SecretString};
use tracing::instrument;

use marketstall_core::Credentials;

use crate::config::ApiConfig;

use super::endpoints::{ACCESS_TOKEN_COOKIE, LOGIN, LOGOUT, ME};
use super::types::{TokenResponse, User};
use super::{ApiClient, ApiError, CacheTag};

// =============================================================================
// Tokens and credentials on the wire
// =============================================================================

/// An access token issued by the backend.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// Expose the raw token.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Authenticate with this token as a bearer header.
    #[must_use]
    pub fn bearer(&self) -> Authorization {
        Authorization::Bearer(self.0.clone())
    }

    /// Authenticate with this token as the backend's session cookie.
    #[must_use]
    pub fn cookie(&self) -> Authorization {
        Authorization::Cookie(self.0.clone())
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// How a request proves who it acts for.
#[derive(Clone)]
pub enum Authorization {
    /// `Authorization: Bearer <token>`.
    Bearer(SecretString),
    /// `Cookie: access_token=<token>`.
    Cookie(SecretString),
}

impl Authorization {
    /// The raw token, whichever way it is sent.
    #[must_use]
    pub fn token(&self) -> &str {
        match self {
            Self::Bearer(token) | Self::Cookie(token) => token.expose_secret(),
        }
    }

    /// The principal this authorization acts for.
    ///
    /// Two authorizations carrying the same token map to the same principal
    /// regardless of transport. Used to key per-user caches and locks.
    #[must_use]
    pub fn principal(&self) -> Principal {
        Principal(Arc::from(self.token()))
    }

    /// Attach the credentials to a request.
    #[must_use]
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => request.bearer_auth(token.expose_secret()),
            Self::Cookie(token) => request.header(
                COOKIE,
                format!("{ACCESS_TOKEN_COOKIE}={}", token.expose_secret()),
            ),
        }
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer([REDACTED])"),
            Self::Cookie(_) => f.write_str("Cookie([REDACTED])"),
        }
    }
}

/// Key for per-user state, compared on the full token.
///
/// `Debug` and `Display` show a short fingerprint, never the token.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Principal(Arc<str>);

impl Principal {
    fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        hasher.finish()
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.fingerprint())
    }
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Principal({self})")
    }
}

/// The OAuth2 password-grant form the backend's login endpoint expects.
#[derive(Debug, Clone)]
pub struct LoginForm {
    pub credentials: Credentials,
    pub scope: String,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
}

impl LoginForm {
    /// A password-grant form without scope or client credentials.
    #[must_use]
    pub const fn password(credentials: Credentials) -> Self {
        Self {
            credentials,
            scope: String::new(),
            client_id: None,
            client_secret: None,
        }
    }

    /// Validate raw input into a form.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::ValidationFailed`] if the username is empty or the
    /// password is shorter than six characters.
    pub fn parse(username: &str, password: &str) -> Result<Self, ApiError> {
        Credentials::parse(username, password)
            .map(Self::password)
            .map_err(|e| ApiError::ValidationFailed(e.to_string()))
    }

    /// Attach the OAuth2 client credentials from `config`, if configured.
    #[must_use]
    pub fn with_client(mut self, config: &ApiConfig) -> Self {
        self.client_id.clone_from(&config.client_id);
        self.client_secret.clone_from(&config.client_secret);
        self
    }

    /// Form fields in submission order.
    fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut fields = vec![
            ("grant_type", "password"),
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.expose()),
            ("scope", self.scope.as_str()),
        ];
        if let Some(client_id) = &self.client_id {
            fields.push(("client_id", client_id.as_str()));
        }
        if let Some(client_secret) = &self.client_secret {
            fields.push(("client_secret", client_secret.expose_secret()));
        }
        fields
    }
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: AccessToken,
    pub token_type: String,
    /// Whether the backend also set its `access_token` cookie.
    pub cookie_set: bool,
}

// =============================================================================
// Auth Methods
// =============================================================================

impl ApiClient {
    /// Log in with a password grant.
    ///
    /// With `set_cookie`, the backend is asked to also set its session
    /// cookie on the response.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthRequired`] or [`ApiError::ValidationFailed`]
    /// for rejected credentials, or an error if the request fails.
    #[instrument(skip(self, form), fields(username = %form.credentials.username))]
    pub async fn login(&self, form: &LoginForm, set_cookie: bool) -> Result<LoginOutcome, ApiError> {
        let mut url = self.endpoint(LOGIN)?;
        if set_cookie {
            url.query_pairs_mut().append_pair("set_cookie", "true");
        }

        let response = self
            .send(self.http().post(url).form(&form.fields()))
            .await?;

        let cookie_set = response.headers().get_all(SET_COOKIE).iter().any(|value| {
            value
                .to_str()
                .is_ok_and(|v| v.starts_with(&format!("{ACCESS_TOKEN_COOKIE}=")))
        });

        let body: TokenResponse = Self::read_json(response).await?;

        tracing::info!(cookie_set, "Logged in");

        Ok(LoginOutcome {
            token: AccessToken::new(body.access_token),
            token_type: body.token_type,
            cookie_set,
        })
    }

    /// Fetch the authenticated user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthRequired`] if the token is missing, expired or
    /// revoked, or an error if the request fails.
    #[instrument(skip(self, auth))]
    pub async fn me(&self, auth: &Authorization) -> Result<User, ApiError> {
        let url = self.endpoint(ME)?;
        self.send_json(auth.apply(self.http().get(url))).await
    }

    /// End the backend session.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, auth))]
    pub async fn logout(&self, auth: &Authorization) -> Result<(), ApiError> {
        let url = self.endpoint(LOGOUT)?;
        let result = self.send(auth.apply(self.http().get(url))).await;

        self.invalidate(CacheTag::Cart);

        result.map(|_| ())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn build(auth: &Authorization) -> reqwest::Request {
        auth.apply(reqwest::Client::new().get("http://backend.local/api/v1/users/me"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_bearer_header() {
        let request = build(&AccessToken::new("tok-1").bearer());
        assert_eq!(
            request.headers().get("authorization").unwrap(),
            "Bearer tok-1"
        );
        assert!(request.headers().get("cookie").is_none());
    }

    #[test]
    fn test_cookie_header() {
        let request = build(&AccessToken::new("tok-1").cookie());
        assert_eq!(
            request.headers().get("cookie").unwrap(),
            "access_token=tok-1"
        );
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn test_principal_ignores_transport() {
        let token = AccessToken::new("tok-1");
        assert_eq!(token.bearer().principal(), token.cookie().principal());
        assert_ne!(
            token.bearer().principal(),
            AccessToken::new("tok-2").bearer().principal()
        );
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let token = AccessToken::new("super-secret");
        assert!(!format!("{token:?}").contains("super-secret"));
        assert!(!format!("{:?}", token.bearer()).contains("super-secret"));
        assert!(!format!("{:?}", token.bearer().principal()).contains("super-secret"));
    }

    #[test]
    fn test_principal_compares_whole_token() {
        let shared_prefix = AccessToken::new("tok-1a").bearer().principal();
        assert_ne!(shared_prefix, AccessToken::new("tok-1").bearer().principal());
        assert_eq!(shared_prefix, AccessToken::new("tok-1a").cookie().principal());
    }

    #[test]
    fn test_login_form_fields() {
        let mut form = LoginForm::parse("shopper", "hunter22").unwrap();
        assert_eq!(
            form.fields(),
            vec![
                ("grant_type", "password"),
                ("username", "shopper"),
                ("password", "hunter22"),
                ("scope", ""),
            ]
        );

        form = form.with_client(&ApiConfig {
            client_id: Some("web".to_string()),
            client_secret: Some(SecretString::from("s3cret")),
            ..ApiConfig::default()
        });
        let fields = form.fields();
        assert!(fields.contains(&("client_id", "web")));
        assert!(fields.contains(&("client_secret", "s3cret")));
    }

    #[test]
    fn test_login_form_validation() {
        assert!(matches!(
            LoginForm::parse("", "hunter22"),
            Err(ApiError::ValidationFailed(msg)) if msg == "Username is required."
        ));
        assert!(matches!(
            LoginForm::parse("shopper", "short"),
            Err(ApiError::ValidationFailed(msg)) if msg.contains("at least 6")
        ));
    }
}
