//! Authentication middleware and extractors.
//!
//! Credentials are resolved in order from the session token, the backend's
//! `access_token` cookie, and an `Authorization: Bearer` header.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::json;
use tower_sessions::Session;

use crate::api::endpoints::ACCESS_TOKEN_COOKIE;
use crate::api::{AccessToken, Authorization, User};
use crate::error::set_sentry_user;
use crate::gate::{GateDecision, SessionGate};
use crate::models::{StoredToken, session_keys};
use crate::state::AppState;

/// Path of the login boundary.
pub const LOGIN_PATH: &str = "/login";

/// Extractor that requires a session the backend accepts.
///
/// If the user is not logged in, returns a redirect to the login page.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireSession { user, .. }: RequireSession,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireSession {
    pub user: User,
    pub auth: Authorization,
}

/// Error returned when a session is required but not usable.
#[derive(Debug)]
pub enum SessionRejection {
    /// Redirect to login page (for page requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// The backend could not check the session.
    Unavailable,
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::Unavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "The store is unreachable right now" })),
            )
                .into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireSession {
    type Rejection = SessionRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().cloned();
        let auth = resolve_authorization(parts, session.as_ref()).await;

        match (SessionGate::check(state.api(), auth.as_ref()).await, auth) {
            (GateDecision::Allow(user), Some(auth)) => {
                let email = (!user.email.is_empty()).then_some(user.email.as_str());
                set_sentry_user(&user.username, email);
                Ok(Self { user, auth })
            }
            (GateDecision::Unavailable(_), _) => Err(SessionRejection::Unavailable),
            _ => {
                // A token the backend rejects is useless; drop it.
                if let Some(session) = &session
                    && let Err(e) = session.remove::<StoredToken>(session_keys::TOKEN).await
                {
                    tracing::warn!(error = %e, "Failed to clear rejected session token");
                }

                if parts.uri.path().starts_with("/api/") {
                    Err(SessionRejection::Unauthorized)
                } else {
                    Err(SessionRejection::RedirectToLogin)
                }
            }
        }
    }
}

/// Extractor for whatever credentials the request carries, unchecked.
///
/// Never rejects and never calls the backend.
pub struct OptionalAuth(pub Option<Authorization>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = parts.extensions.get::<Session>().cloned();
        Ok(Self(resolve_authorization(parts, session.as_ref()).await))
    }
}

/// Find the request's credentials.
pub async fn resolve_authorization(parts: &Parts, session: Option<&Session>) -> Option<Authorization> {
    if let Some(session) = session
        && let Ok(Some(stored)) = session.get::<StoredToken>(session_keys::TOKEN).await
    {
        return Some(stored.authorization());
    }

    if let Some(token) = cookie_value(parts, ACCESS_TOKEN_COOKIE) {
        return Some(AccessToken::new(token).cookie());
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| AccessToken::new(token).bearer())
}

/// Value of cookie `name` from the request's `Cookie` headers.
fn cookie_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// Helper to store the backend token in the session (login).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_session_token(
    session: &Session,
    token: &AccessToken,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session
        .insert(session_keys::TOKEN, StoredToken::new(token))
        .await
}

/// Helper to clear all auth and cart state from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/cart");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_no_credentials() {
        assert!(resolve_authorization(&parts(&[]), None).await.is_none());
    }

    #[tokio::test]
    async fn test_cookie_credentials() {
        let parts = parts(&[("cookie", "theme=dark; access_token=tok-c; other=1")]);
        let auth = resolve_authorization(&parts, None).await.unwrap();
        assert!(matches!(auth, Authorization::Cookie(_)));
        assert_eq!(auth.token(), "tok-c");
    }

    #[tokio::test]
    async fn test_bearer_credentials() {
        let parts = parts(&[("authorization", "Bearer tok-b")]);
        let auth = resolve_authorization(&parts, None).await.unwrap();
        assert!(matches!(auth, Authorization::Bearer(_)));
        assert_eq!(auth.token(), "tok-b");
    }

    #[tokio::test]
    async fn test_cookie_preferred_over_header() {
        let parts = parts(&[
            ("cookie", "access_token=tok-c"),
            ("authorization", "Bearer tok-b"),
        ]);
        let auth = resolve_authorization(&parts, None).await.unwrap();
        assert_eq!(auth.token(), "tok-c");
    }

    #[test]
    fn test_empty_cookie_is_ignored() {
        let parts = parts(&[("cookie", "access_token=")]);
        assert!(cookie_value(&parts, ACCESS_TOKEN_COOKIE).is_none());
    }

    #[test]
    fn test_rejection_responses() {
        let redirect = SessionRejection::RedirectToLogin.into_response();
        assert_eq!(redirect.status(), StatusCode::SEE_OTHER);
        assert_eq!(redirect.headers()[header::LOCATION], LOGIN_PATH);

        assert_eq!(
            SessionRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            SessionRejection::Unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
