//! Marketstall storefront library.
//!
//! A backend-for-frontend in front of the commerce API: it keeps the user's
//! token in a server-side session, resolves a default cart per user, and
//! serves product and cart views as JSON. The [`api`] module is the typed
//! client for the backend and is usable on its own.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;

use axum::{Router, extract::Request, middleware::from_fn};
use tower_http::trace::TraceLayer;

use middleware::RateLimiterLayer;
use state::AppState;

/// Build the storefront router.
///
/// `login_limiter`, when given, limits `POST /login`.
pub fn app(state: AppState, login_limiter: Option<RateLimiterLayer>) -> Router {
    let session_layer = middleware::create_session_layer(state.config());

    routes::routes(login_limiter)
        .layer(session_layer)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
