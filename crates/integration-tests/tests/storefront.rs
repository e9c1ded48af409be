//! End-to-end tests of the storefront routes against the fake backend.
//!
//! Most tests run the storefront on a real listener with a cookie-keeping
//! client, so sessions behave as they would in a browser. Tests that need no
//! session drive the router directly with `oneshot`.

use std::str::FromStr;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use reqwest::Response;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;

use marketstall_integration_tests::{
    Call, FakeBackend, Storefront, storefront_config, unreachable_url,
};
use marketstall_storefront::state::AppState;

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.to_string().trim_matches('"')).unwrap()
}

fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

async fn json_body(response: Response) -> Value {
    response.json().await.unwrap()
}

async fn logged_in(backend: &FakeBackend) -> Storefront {
    let storefront = Storefront::start(backend.base_url()).await;
    let response = storefront.login("alice", "wonderland").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    storefront
}

// ============================================================================
// Router without a session
// ============================================================================

async fn oneshot(api_url: url::Url, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let state = AppState::new(storefront_config(api_url)).unwrap();
    let response = marketstall_storefront::app(state, None)
        .oneshot(request)
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

#[tokio::test]
async fn test_health() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let state = AppState::new(storefront_config(unreachable_url().await)).unwrap();
    let response = marketstall_storefront::app(state, None)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), b"ok");
}

#[tokio::test]
async fn test_unauthenticated_session_redirects_to_login_without_backend_call() {
    let backend = FakeBackend::start().await;
    let request = Request::get("/session").body(Body::empty()).unwrap();

    let (status, headers, _) = oneshot(backend.base_url(), request).await;

    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(headers.get(header::LOCATION).unwrap(), "/login");
    assert_eq!(backend.calls(Call::Me), 0);
}

#[tokio::test]
async fn test_session_check_with_backend_down_is_unavailable() {
    let request = Request::get("/cart")
        .header(header::AUTHORIZATION, "Bearer some-token")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = oneshot(unreachable_url().await, request).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(headers.get(header::LOCATION).is_none());
    assert_eq!(body["error"], "The store is unreachable right now");
}

#[tokio::test]
async fn test_every_response_carries_request_id() {
    let request = Request::get("/health")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();

    let (_, headers, _) = oneshot(unreachable_url().await, request).await;

    assert_eq!(headers.get("x-request-id").unwrap(), "req-123");
}

// ============================================================================
// Login and logout
// ============================================================================

#[tokio::test]
async fn test_login_page_reports_status() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;

    let before = json_body(storefront.get("/login").await).await;
    assert_eq!(before, json!({ "authenticated": false, "login_path": "/login" }));

    storefront.login("alice", "wonderland").await;
    let after = json_body(storefront.get("/login").await).await;
    assert_eq!(after["authenticated"], true);
}

#[tokio::test]
async fn test_invalid_login_is_401_without_redirect() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;

    let response = storefront.login("alice", "wrong-password").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(location(&response).is_none());
    let body = json_body(response).await;
    assert_eq!(body["error"], "Incorrect username or password");
}

#[tokio::test]
async fn test_short_password_is_rejected_before_backend() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;

    let response = storefront.login("alice", "abc").await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(backend.calls(Call::Login), 0);
}

#[tokio::test]
async fn test_login_stores_session_and_selects_cart() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;

    let response = storefront.login("alice", "wonderland").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/"));

    let user = json_body(storefront.get("/session").await).await;
    assert_eq!(user["username"], "alice");

    let carts = backend.carts_of("alice");
    assert_eq!(carts.len(), 1);
    assert_eq!(carts[0].name, "default");
}

#[tokio::test]
async fn test_login_with_backend_down_is_unavailable() {
    let storefront = Storefront::start(unreachable_url().await).await;

    let response = storefront.login("alice", "wonderland").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(location(&response).is_none());
}

#[tokio::test]
async fn test_logout_clears_session() {
    let backend = FakeBackend::start().await;
    let storefront = logged_in(&backend).await;

    let response = storefront
        .client
        .post(storefront.url("/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
    assert_eq!(backend.calls(Call::Logout), 1);

    let response = storefront.get("/session").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn test_revoked_token_redirects_to_login() {
    let backend = FakeBackend::start().await;
    let storefront = logged_in(&backend).await;
    backend.revoke_tokens("alice");

    let response = storefront.get("/cart").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
}

// ============================================================================
// Products
// ============================================================================

#[tokio::test]
async fn test_product_listing_is_public_and_priced() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;

    let page = json_body(storefront.get("/products?page_size=2").await).await;

    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(page["total"], 3);
    assert_eq!(page["has_next"], true);
    assert_eq!(page["items"][0]["name"], "Mango Pickle");
    assert_eq!(decimal(&page["items"][0]["unit_price"]), Decimal::from(180));
    assert_eq!(page["items"][1]["in_stock"], false);
    assert_eq!(page["items"][0]["tag_list"], json!(["pickle", "spicy"]));
}

#[tokio::test]
async fn test_product_detail_and_missing_product() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;

    let product = json_body(storefront.get("/products/3").await).await;
    assert_eq!(decimal(&product["unit_price"]), Decimal::from(849));
    assert_eq!(product["display_price"], "₹849.00");

    let response = storefront.get("/products/99").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Product not found");
}

#[tokio::test]
async fn test_products_by_category() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;

    let page = json_body(storefront.get("/categories/1/products").await).await;

    assert_eq!(page["total"], 2);
}

// ============================================================================
// Default cart
// ============================================================================

#[tokio::test]
async fn test_cart_requires_login() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;

    let response = storefront.get("/cart").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), Some("/login"));
}

#[tokio::test]
async fn test_adding_twice_merges_quantities() {
    let backend = FakeBackend::start().await;
    let storefront = logged_in(&backend).await;

    for _ in 0..2 {
        let response = storefront
            .client
            .post(storefront.url("/cart/items"))
            .json(&json!({ "product_id": 1, "quantity": 2 }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let cart = json_body(storefront.get("/cart").await).await;
    assert_eq!(cart["name"], "default");
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 4);
    assert_eq!(cart["total_quantity"], 4);
    assert_eq!(backend.calls(Call::CreateCart), 1);
}

#[tokio::test]
async fn test_checkout_prices_default_cart() {
    let backend = FakeBackend::start().await;
    let storefront = logged_in(&backend).await;

    for (product_id, quantity) in [(1, 4), (3, 1)] {
        storefront
            .client
            .post(storefront.url("/cart/items"))
            .json(&json!({ "product_id": product_id, "quantity": quantity }))
            .send()
            .await
            .unwrap();
    }

    let summary = json_body(storefront.get("/checkout").await).await;

    // 4 x 180.00 at 5% tax, 1 x 849.00 at 12% tax
    assert_eq!(summary["item_count"], 5);
    assert_eq!(summary["currency"], "INR");
    assert_eq!(decimal(&summary["subtotal"]), Decimal::from(1569));
    assert_eq!(decimal(&summary["tax"]), Decimal::from_str("137.88").unwrap());
    assert_eq!(decimal(&summary["total"]), Decimal::from_str("1706.88").unwrap());
    assert_eq!(decimal(&summary["lines"][0]["line_total"]), Decimal::from(720));
}

#[tokio::test]
async fn test_deleted_default_cart_is_replaced() {
    let backend = FakeBackend::start().await;
    let storefront = logged_in(&backend).await;
    let original = backend.carts_of("alice")[0].id;

    backend.remove_cart(original);
    let response = storefront.get("/cart").await;

    assert_eq!(response.status(), StatusCode::OK);
    let carts = backend.carts_of("alice");
    assert_eq!(carts.len(), 1);
    assert_ne!(carts[0].id, original);
    assert_eq!(json_body(response).await["id"], carts[0].id);
}

async fn add_one(storefront: &Storefront, product_id: i32) -> Response {
    storefront
        .client
        .post(storefront.url("/cart/items"))
        .json(&json!({ "product_id": product_id, "quantity": 1 }))
        .send()
        .await
        .unwrap()
}

async fn proxy_add_item(storefront: &Storefront, cart_id: &Value, product_id: i32, quantity: i32) {
    let response = storefront
        .client
        .post(storefront.url("/api/v1/cart/add-item"))
        .json(&json!({ "cart_id": cart_id, "product_id": product_id, "quantity": quantity }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cart_change_through_proxy_is_visible() {
    let backend = FakeBackend::start().await;
    let storefront = logged_in(&backend).await;

    let before = json_body(storefront.get("/cart").await).await;
    assert!(before["items"].as_array().unwrap().is_empty());

    proxy_add_item(&storefront, &before["id"], 1, 2).await;

    let after = json_body(storefront.get("/cart").await).await;
    assert_eq!(after["items"].as_array().unwrap().len(), 1);
    assert_eq!(after["items"][0]["quantity"], 2);
    assert_eq!(after["total_quantity"], 2);
}

#[tokio::test]
async fn test_empty_backend_line_is_left_out_of_cart() {
    let backend = FakeBackend::start().await;
    let storefront = logged_in(&backend).await;
    let cart_id = json_body(storefront.get("/cart").await).await["id"].clone();

    proxy_add_item(&storefront, &cart_id, 1, 0).await;
    proxy_add_item(&storefront, &cart_id, 3, 1).await;

    let response = storefront.get("/cart").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cart = json_body(response).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["product_id"], 3);

    let response = storefront.get("/checkout").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["item_count"], 1);
}

#[tokio::test]
async fn test_relogin_as_another_user_forgets_previous_cart() {
    let backend = FakeBackend::start().await;
    let storefront = logged_in(&backend).await;
    let alice_cart = backend.carts_of("alice")[0].id;

    backend.fail_creates(true);
    let response = storefront.login("bob", "builder").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = add_one(&storefront, 1).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    backend.fail_creates(false);
    let response = add_one(&storefront, 1).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let bob_carts = backend.carts_of("bob");
    assert_eq!(bob_carts.len(), 1);
    assert_ne!(bob_carts[0].id, alice_cart);
    assert_eq!(json_body(response).await["cart_id"], bob_carts[0].id);
    assert_eq!(bob_carts[0].items, vec![(1, 1)]);
    assert!(backend.carts_of("alice")[0].items.is_empty());
}

#[tokio::test]
async fn test_cart_creation_failure_is_unavailable() {
    let backend = FakeBackend::start().await;
    backend.fail_creates(true);
    let storefront = logged_in(&backend).await;

    let response = storefront.get("/cart").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        json_body(response).await["error"],
        "Could not create your cart, please try again"
    );
}

// ============================================================================
// Local cart
// ============================================================================

#[tokio::test]
async fn test_local_cart_add_update_remove() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;
    let add = || {
        storefront
            .client
            .post(storefront.url("/cart/local/items"))
            .json(&json!({ "product_id": 3, "quantity": 2 }))
            .send()
    };

    add().await.unwrap();
    let cart = json_body(add().await.unwrap()).await;
    assert_eq!(cart["line_count"], 1);
    assert_eq!(cart["items"][0]["quantity"], 4);

    let cart = json_body(
        storefront
            .client
            .put(storefront.url("/cart/local/items/3"))
            .json(&json!({ "quantity": 0 }))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(cart["line_count"], 0);

    add().await.unwrap();
    let cart = json_body(
        storefront
            .client
            .delete(storefront.url("/cart/local/items/3"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(cart["total_quantity"], 0);

    add().await.unwrap();
    let cart = json_body(
        storefront
            .client
            .delete(storefront.url("/cart/local"))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(cart["line_count"], 0);
    assert_eq!(backend.calls(Call::Me), 0);
}

#[tokio::test]
async fn test_local_cart_is_per_browser() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;

    storefront
        .client
        .post(storefront.url("/cart/local/items"))
        .json(&json!({ "product_id": 1 }))
        .send()
        .await
        .unwrap();

    let other = Storefront::new_client()
        .get(storefront.url("/cart/local"))
        .send()
        .await
        .unwrap();
    assert_eq!(json_body(other).await["line_count"], 0);

    let mine = json_body(storefront.get("/cart/local").await).await;
    assert_eq!(mine["items"][0]["quantity"], 1);
}

// ============================================================================
// Backend proxy
// ============================================================================

#[tokio::test]
async fn test_proxy_forwards_query_body_and_request_id() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;

    let response = storefront
        .client
        .post(storefront.url("/api/v1/echo?page=2&name=rice"))
        .header("x-request-id", "proxy-1")
        .json(&json!({ "hello": "world" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers().get("x-request-id").unwrap(), "proxy-1");
    let echo = json_body(response).await;
    assert_eq!(echo["method"], "POST");
    assert_eq!(echo["path"], "/api/v1/echo");
    assert_eq!(echo["query"], "page=2&name=rice");
    assert_eq!(echo["body"], r#"{"hello":"world"}"#);
    assert_eq!(echo["content_type"], "application/json");
    assert_eq!(echo["request_id"], "proxy-1");
    assert_eq!(echo["authorization"], Value::Null);
}

#[tokio::test]
async fn test_proxy_sends_session_token_but_not_session_cookie() {
    let backend = FakeBackend::start().await;
    let storefront = logged_in(&backend).await;

    let echo = json_body(storefront.get("/api/v1/echo").await).await;

    let authorization = echo["authorization"].as_str().unwrap();
    assert!(authorization.starts_with("Bearer token-alice-"));
    assert_eq!(echo["cookie"], Value::Null);
}

#[tokio::test]
async fn test_proxy_relays_backend_errors() {
    let backend = FakeBackend::start().await;
    let storefront = Storefront::start(backend.base_url()).await;

    let response = storefront.get("/api/v1/product/get-by-id/99").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["detail"], "Product not found");
}

#[tokio::test]
async fn test_proxy_with_backend_down_is_unavailable() {
    let storefront = Storefront::start(unreachable_url().await).await;

    let response = storefront.get("/api/v1/product").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
