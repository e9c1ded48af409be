//! Authentication route handlers.
//!
//! Login exchanges a username and password for a backend token kept in the
//! server-side session. The browser only ever holds the session cookie.

use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::api::{ApiError, LoginForm, User};
use crate::cart::DefaultCartSlice;
use crate::error::{AppError, Result, clear_sentry_user};
use crate::middleware::{
    LOGIN_PATH, OptionalAuth, RequireSession, clear_session, set_session_token, store_slice,
};
use crate::models::session_keys;
use crate::routes::cart::reset_default_cart;
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Status of the login boundary.
#[derive(Debug, Serialize)]
pub struct LoginStatus {
    pub authenticated: bool,
    pub login_path: &'static str,
}

/// Display the login boundary.
///
/// Reports whether the request already carries credentials; it does not
/// validate them.
pub async fn login_page(OptionalAuth(auth): OptionalAuth) -> Json<LoginStatus> {
    Json(LoginStatus {
        authenticated: auth.is_some(),
        login_path: LOGIN_PATH,
    })
}

/// Handle login form submission.
///
/// On success the token is stored in the session, the default cart is
/// selected, and the browser is sent to `/`. Rejected credentials answer 401
/// with the backend's message and do not redirect.
#[instrument(skip(state, session, form), fields(username = %form.username))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginRequest>,
) -> Result<Response> {
    let login_form = LoginForm::parse(&form.username, &form.password)?
        .with_client(&state.config().api);

    let outcome = match state.api().login(&login_form, false).await {
        Ok(outcome) => outcome,
        Err(e @ (ApiError::AuthRequired(_) | ApiError::Forbidden(_) | ApiError::ValidationFailed(_))) => {
            tracing::warn!(error = %e, "Login rejected");
            return Err(AppError::Unauthorized(e.user_message()));
        }
        Err(e) => return Err(e.into()),
    };

    set_session_token(&session, &outcome.token).await?;

    // A selection left by a previous login belongs to another principal.
    reset_default_cart(&session).await?;

    // Retried lazily on first cart use if this fails.
    let auth = outcome.token.bearer();
    let mut slice = DefaultCartSlice::default();
    match state
        .initializer()
        .initialize(state.api(), &auth, &mut slice)
        .await
    {
        Ok(init) => {
            tracing::info!(cart_id = %init.cart_id(), "Default cart ready");
            store_slice(&session, session_keys::DEFAULT_CART, slice).await?;
        }
        Err(e) => tracing::warn!(error = %e, "Default cart initialization failed after login"),
    }

    Ok(Redirect::to("/").into_response())
}

/// Handle logout.
///
/// The local session is always cleared, even if the backend call fails.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(auth): OptionalAuth,
) -> Result<Redirect> {
    if let Some(auth) = auth
        && let Err(e) = state.api().logout(&auth).await
    {
        tracing::warn!(error = %e, "Backend logout failed");
    }

    clear_session(&session).await?;
    clear_sentry_user();

    Ok(Redirect::to(LOGIN_PATH))
}

/// Current user, for clients checking their session.
pub async fn session_info(RequireSession { user, .. }: RequireSession) -> Json<User> {
    Json(user)
}
