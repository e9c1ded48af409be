//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Health check
//!
//! # Auth
//! GET  /login                           - Login boundary status
//! POST /login                           - Login action (form)
//! POST /logout                          - Logout action
//! GET  /session                         - Current user (requires auth)
//!
//! # Products
//! GET  /products                        - Product listing (paged)
//! GET  /products/{id}                   - Product detail
//! GET  /categories/{id}/products        - Products in a category
//!
//! # Cart (requires auth)
//! GET  /cart                            - Default cart with items
//! POST /cart/items                      - Add item to default cart
//! GET  /checkout                        - Priced summary of default cart
//!
//! # Local cart (session only)
//! GET    /cart/local                    - Local cart contents
//! DELETE /cart/local                    - Empty the local cart
//! POST   /cart/local/items              - Add item
//! PUT    /cart/local/items/{product_id} - Set quantity
//! DELETE /cart/local/items/{product_id} - Remove item
//!
//! # Backend pass-through
//! ANY  /api/{*path}                     - Forwarded to the backend API
//! ```

pub mod auth;
pub mod cart;
pub mod local_cart;
pub mod products;
pub mod proxy;

use axum::{
    Router,
    routing::{any, get, post, put},
};

use crate::middleware::RateLimiterLayer;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the backend.
pub async fn health() -> &'static str {
    "ok"
}

/// Create the auth routes router.
///
/// `login_limiter`, when given, limits login submissions only.
pub fn auth_routes(login_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    let submit = match login_limiter {
        Some(limiter) => post(auth::login).layer(limiter),
        None => post(auth::login),
    };

    Router::new()
        .route("/login", get(auth::login_page).merge(submit))
        .route("/logout", post(auth::logout))
        .route("/session", get(auth::session_info))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/products/{id}", get(products::show))
        .route("/categories/{id}/products", get(products::by_category))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(cart::show))
        .route("/cart/items", post(cart::add_item))
        .route("/checkout", get(cart::checkout))
        .route("/cart/local", get(local_cart::show).delete(local_cart::clear))
        .route("/cart/local/items", post(local_cart::add))
        .route(
            "/cart/local/items/{product_id}",
            put(local_cart::update).delete(local_cart::remove),
        )
}

/// Create all routes for the storefront.
pub fn routes(login_limiter: Option<RateLimiterLayer>) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth_routes(login_limiter))
        .merge(product_routes())
        .merge(cart_routes())
        .route("/api/{*path}", any(proxy::forward))
}
