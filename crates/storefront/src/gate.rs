//! Session gate.
//!
//! Decides whether a request may proceed as an authenticated user. An
//! expired or missing session sends the user to the login boundary; a
//! backend that cannot answer does NOT.

use std::future::Future;

use tracing::instrument;

use crate::api::{ApiClient, ApiError, Authorization, User};

/// The user lookup the gate needs.
pub trait SessionBackend: Send + Sync {
    fn me(&self, auth: &Authorization) -> impl Future<Output = Result<User, ApiError>> + Send;
}

impl SessionBackend for ApiClient {
    fn me(&self, auth: &Authorization) -> impl Future<Output = Result<User, ApiError>> + Send {
        Self::me(self, auth)
    }
}

/// Outcome of a session check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// The session is valid.
    Allow(User),
    /// No session, or the backend rejected it.
    RedirectToLogin,
    /// The backend could not decide; the reason is for logs only.
    Unavailable(String),
}

/// Checks credentials against the backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionGate;

impl SessionGate {
    /// Check `auth`, if any.
    ///
    /// Without credentials no request is made.
    #[instrument(skip_all, fields(has_auth = auth.is_some()))]
    pub async fn check<B: SessionBackend>(backend: &B, auth: Option<&Authorization>) -> GateDecision {
        let Some(auth) = auth else {
            return GateDecision::RedirectToLogin;
        };

        match backend.me(auth).await {
            Ok(user) => GateDecision::Allow(user),
            Err(e) if e.is_auth_failure() => {
                tracing::debug!(error = %e, "Session rejected by backend");
                GateDecision::RedirectToLogin
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session check failed");
                GateDecision::Unavailable(e.to_string())
            }
        }
    }
}
