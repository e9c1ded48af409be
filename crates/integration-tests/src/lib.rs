//! Integration tests for Marketstall.
//!
//! Everything runs in-process: [`FakeBackend`] serves the subset of the
//! commerce API the storefront uses, and [`Storefront`] runs the real
//! storefront router against it on an ephemeral port.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p marketstall-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `api_client` - Typed backend client and its cache
//! - `cart_initialization` - Default cart selection against the backend
//! - `storefront` - Storefront routes end to end

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

use marketstall_storefront::api::ApiClient;
use marketstall_storefront::config::{ApiConfig, StorefrontConfig};
use marketstall_storefront::state::AppState;

/// Seeded accounts as `(username, password)`.
pub const USERS: &[(&str, &str)] = &[("alice", "wonderland"), ("bob", "builder")];

/// Listing carts waits this long, so concurrent first requests overlap.
const LIST_CARTS_DELAY: Duration = Duration::from_millis(20);

/// Backend calls the fake counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Login,
    Me,
    Logout,
    ListCarts,
    CreateCart,
    AddItem,
    Products,
}

/// A cart held by the fake backend.
#[derive(Debug, Clone)]
pub struct FakeCart {
    pub id: i32,
    pub owner: String,
    pub name: String,
    pub reminder_date: Option<String>,
    /// `(product_id, quantity)` lines.
    pub items: Vec<(i32, i64)>,
}

#[derive(Default)]
struct Data {
    tokens: HashMap<String, String>,
    carts: Vec<FakeCart>,
    products: Vec<Value>,
    next_cart_id: i32,
    next_token: u32,
}

#[derive(Default)]
struct Shared {
    data: Mutex<Data>,
    calls: Mutex<HashMap<Call, usize>>,
    fail_creates: AtomicBool,
}

impl Shared {
    fn data(&self) -> MutexGuard<'_, Data> {
        self.data.lock().expect("fake backend data poisoned")
    }

    fn record(&self, call: Call) {
        *self
            .calls
            .lock()
            .expect("fake backend counters poisoned")
            .entry(call)
            .or_default() += 1;
    }

    fn principal(&self, headers: &HeaderMap) -> Option<String> {
        let token = token_from(headers)?;
        self.data().tokens.get(&token).cloned()
    }
}

/// The request's token, from a bearer header or the `access_token` cookie.
fn token_from(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == "access_token")
            .map(|(_, value)| value.to_string())
    })
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

fn not_authenticated() -> Response {
    detail(StatusCode::UNAUTHORIZED, "Not authenticated")
}

fn seed_products() -> Vec<Value> {
    vec![
        json!({
            "id": 1, "name": "Mango Pickle", "description": "Spicy raw mango",
            "price": "200.00", "slug": "mango-pickle", "tags": "pickle,spicy",
            "discount": "10.00", "tax": "5.00", "stock": 12, "category_id": 1,
            "sub_category_ids": [1], "is_active": true, "images": []
        }),
        json!({
            "id": 2, "name": "Lime Pickle", "description": null,
            "price": "150.00", "slug": "lime-pickle", "tags": "pickle",
            "discount": "0.00", "tax": "5.00", "stock": 0, "category_id": 1,
            "sub_category_ids": null, "is_active": true, "images": []
        }),
        json!({
            "id": 3, "name": "Basmati Rice", "description": "5kg",
            "price": "899.00", "slug": "basmati-rice", "tags": null,
            "discount": "0.00", "tax": "12.00", "stock": 40, "category_id": 2,
            "sub_category_ids": [], "is_active": true, "images": [],
            "computed_price": "849.00"
        }),
    ]
}

// =============================================================================
// Backend handlers
// =============================================================================

#[derive(Deserialize)]
struct LoginQuery {
    #[serde(default)]
    set_cookie: bool,
}

async fn login(
    State(shared): State<Arc<Shared>>,
    Query(query): Query<LoginQuery>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    shared.record(Call::Login);

    if form.get("grant_type").map(String::as_str) != Some("password") {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "detail": [{"loc": ["body", "grant_type"], "msg": "field required"}]
            })),
        )
            .into_response();
    }

    let username = form.get("username").cloned().unwrap_or_default();
    let password = form.get("password").cloned().unwrap_or_default();
    if !USERS
        .iter()
        .any(|(u, p)| *u == username && *p == password)
    {
        return detail(StatusCode::UNAUTHORIZED, "Incorrect username or password");
    }

    let token = {
        let mut data = shared.data();
        data.next_token += 1;
        let token = format!("token-{username}-{}", data.next_token);
        data.tokens.insert(token.clone(), username);
        token
    };

    let body = Json(json!({ "access_token": token, "token_type": "bearer" }));
    if query.set_cookie {
        (
            [(
                header::SET_COOKIE,
                format!("access_token={token}; HttpOnly; Path=/"),
            )],
            body,
        )
            .into_response()
    } else {
        body.into_response()
    }
}

async fn me(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Response {
    shared.record(Call::Me);
    let Some(username) = shared.principal(&headers) else {
        return not_authenticated();
    };

    let id = USERS
        .iter()
        .position(|(u, _)| *u == username)
        .map_or(0, |index| index + 1);
    Json(json!({
        "id": id,
        "username": username,
        "email": format!("{username}@example.com"),
        "full_name": null,
        "phone": null,
        "address": null
    }))
    .into_response()
}

async fn logout(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Response {
    shared.record(Call::Logout);
    let Some(token) = token_from(&headers) else {
        return not_authenticated();
    };
    if shared.data().tokens.remove(&token).is_none() {
        return not_authenticated();
    }
    Json(json!({ "message": "Successfully logged out" })).into_response()
}

#[derive(Deserialize)]
struct ProductParams {
    page: Option<usize>,
    page_size: Option<usize>,
    name: Option<String>,
    category_id: Option<i64>,
}

async fn list_products(
    State(shared): State<Arc<Shared>>,
    Query(params): Query<ProductParams>,
) -> Json<Value> {
    shared.record(Call::Products);

    let matching: Vec<Value> = shared
        .data()
        .products
        .iter()
        .filter(|p| {
            params
                .category_id
                .is_none_or(|id| p["category_id"].as_i64() == Some(id))
        })
        .filter(|p| {
            params.name.as_deref().is_none_or(|name| {
                p["name"]
                    .as_str()
                    .is_some_and(|n| n.to_lowercase().contains(&name.to_lowercase()))
            })
        })
        .cloned()
        .collect();

    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(10).max(1);
    let total = matching.len();
    let total_pages = total.div_ceil(page_size);
    let items: Vec<Value> = matching
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Json(json!({
        "items": items,
        "total": total,
        "page": page,
        "page_size": page_size,
        "total_pages": total_pages,
        "has_next": page < total_pages,
        "has_previous": page > 1
    }))
}

async fn product_by_id(State(shared): State<Arc<Shared>>, Path(id): Path<i64>) -> Response {
    shared.record(Call::Products);
    let product = shared
        .data()
        .products
        .iter()
        .find(|p| p["id"].as_i64() == Some(id))
        .cloned();
    product.map_or_else(
        || detail(StatusCode::NOT_FOUND, "Product not found"),
        |product| Json(product).into_response(),
    )
}

#[derive(Deserialize)]
struct CategoryParams {
    category_id: i64,
}

async fn products_by_category(
    State(shared): State<Arc<Shared>>,
    Query(params): Query<CategoryParams>,
) -> Json<Vec<Value>> {
    shared.record(Call::Products);
    let products = shared
        .data()
        .products
        .iter()
        .filter(|p| p["category_id"].as_i64() == Some(params.category_id))
        .cloned()
        .collect();
    Json(products)
}

#[derive(Deserialize)]
struct CartParams {
    #[serde(default)]
    get_items: bool,
}

fn cart_json(cart: &FakeCart, with_items: bool) -> Value {
    let items: Vec<Value> = if with_items {
        cart.items
            .iter()
            .enumerate()
            .map(|(index, (product_id, quantity))| {
                json!({ "id": index + 1, "product_id": product_id, "quantity": quantity })
            })
            .collect()
    } else {
        Vec::new()
    };

    json!({
        "id": cart.id,
        "name": cart.name,
        "reminder_date": cart.reminder_date,
        "status": "active",
        "items": items
    })
}

async fn list_carts(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Query(params): Query<CartParams>,
) -> Response {
    shared.record(Call::ListCarts);
    let Some(owner) = shared.principal(&headers) else {
        return not_authenticated();
    };

    tokio::time::sleep(LIST_CARTS_DELAY).await;

    let carts: Vec<Value> = shared
        .data()
        .carts
        .iter()
        .filter(|cart| cart.owner == owner)
        .map(|cart| cart_json(cart, params.get_items))
        .collect();
    Json(carts).into_response()
}

#[derive(Deserialize)]
struct CreateCart {
    name: String,
    reminder_date: Option<String>,
}

async fn create_cart(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<CreateCart>,
) -> Response {
    shared.record(Call::CreateCart);
    let Some(owner) = shared.principal(&headers) else {
        return not_authenticated();
    };
    if shared.fail_creates.load(Ordering::SeqCst) {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
    }

    let id = insert_cart(&mut shared.data(), &owner, &body.name, body.reminder_date);
    Json(json!({ "id": id })).into_response()
}

fn insert_cart(data: &mut Data, owner: &str, name: &str, reminder_date: Option<String>) -> i32 {
    data.next_cart_id += 1;
    let id = data.next_cart_id;
    data.carts.push(FakeCart {
        id,
        owner: owner.to_string(),
        name: name.to_string(),
        reminder_date,
        items: Vec::new(),
    });
    id
}

#[derive(Deserialize)]
struct AddItem {
    cart_id: i32,
    product_id: i64,
    quantity: i64,
}

async fn add_item(
    State(shared): State<Arc<Shared>>,
    headers: HeaderMap,
    Json(body): Json<AddItem>,
) -> Response {
    shared.record(Call::AddItem);
    let Some(owner) = shared.principal(&headers) else {
        return not_authenticated();
    };

    let mut data = shared.data();
    if !data
        .products
        .iter()
        .any(|p| p["id"].as_i64() == Some(body.product_id))
    {
        return detail(StatusCode::NOT_FOUND, "Product not found");
    }
    let Some(cart) = data
        .carts
        .iter_mut()
        .find(|cart| cart.id == body.cart_id && cart.owner == owner)
    else {
        return detail(StatusCode::NOT_FOUND, "Cart not found");
    };

    let product_id = i32::try_from(body.product_id).unwrap_or_default();
    match cart.items.iter_mut().find(|(id, _)| *id == product_id) {
        Some((_, quantity)) => *quantity += body.quantity,
        None => cart.items.push((product_id, body.quantity)),
    }
    Json(json!({ "message": "Item added to cart" })).into_response()
}

/// Reflects what the backend received, for proxy tests.
async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: String) -> Json<Value> {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "body": body,
        "authorization": header_value("authorization"),
        "cookie": header_value("cookie"),
        "content_type": header_value("content-type"),
        "request_id": header_value("x-request-id")
    }))
}

// =============================================================================
// Fake backend
// =============================================================================

/// An in-process commerce backend on an ephemeral port.
#[derive(Clone)]
pub struct FakeBackend {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl FakeBackend {
    /// Start a backend seeded with [`USERS`] and three products.
    pub async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        shared.data().products = seed_products();

        let app = Router::new()
            .route("/api/v1/users/login", post(login))
            .route("/api/v1/users/me", get(me))
            .route("/api/v1/users/logout", get(logout))
            .route("/api/v1/product", get(list_products))
            .route("/api/v1/product/get-by-id/{id}", get(product_by_id))
            .route(
                "/api/v1/product/get-by-category-id",
                get(products_by_category),
            )
            .route("/api/v1/cart", get(list_carts))
            .route("/api/v1/cart/create", post(create_cart))
            .route("/api/v1/cart/add-item", post(add_item))
            .route("/api/v1/echo", any(echo))
            .with_state(Arc::clone(&shared));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Fake backend has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { addr, shared }
    }

    /// Base URL to point clients at.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("Fake backend URL is valid")
    }

    /// A fresh client against this backend, with its own cache.
    #[must_use]
    pub fn client(&self) -> ApiClient {
        ApiClient::new(&ApiConfig {
            base_url: self.base_url(),
            ..ApiConfig::default()
        })
        .expect("Failed to build API client")
    }

    /// How often `call` was received.
    #[must_use]
    pub fn calls(&self, call: Call) -> usize {
        self.shared
            .calls
            .lock()
            .expect("fake backend counters poisoned")
            .get(&call)
            .copied()
            .unwrap_or_default()
    }

    /// Make cart creation answer 500.
    pub fn fail_creates(&self, fail: bool) {
        self.shared.fail_creates.store(fail, Ordering::SeqCst);
    }

    /// Add a cart directly, returning its id.
    pub fn seed_cart(&self, owner: &str, name: &str) -> i32 {
        insert_cart(&mut self.shared.data(), owner, name, None)
    }

    /// Delete a cart behind the client's back.
    pub fn remove_cart(&self, id: i32) {
        self.shared.data().carts.retain(|cart| cart.id != id);
    }

    /// The carts `owner` has.
    #[must_use]
    pub fn carts_of(&self, owner: &str) -> Vec<FakeCart> {
        self.shared
            .data()
            .carts
            .iter()
            .filter(|cart| cart.owner == owner)
            .cloned()
            .collect()
    }

    /// Invalidate every token issued to `username`.
    pub fn revoke_tokens(&self, username: &str) {
        self.shared
            .data()
            .tokens
            .retain(|_, owner| owner != username);
    }
}

/// A URL nothing listens on.
pub async fn unreachable_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind throwaway listener");
    let addr = listener.local_addr().expect("Throwaway listener has no address");
    drop(listener);
    Url::parse(&format!("http://{addr}/")).expect("Unreachable URL is valid")
}

// =============================================================================
// Storefront
// =============================================================================

/// Storefront configuration for tests, pointed at `api_url`.
#[must_use]
pub fn storefront_config(api_url: Url) -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://127.0.0.1".to_string(),
        session_ttl: Duration::from_secs(3600),
        cart_reminder_days: 1,
        trust_proxy_headers: false,
        api: ApiConfig {
            base_url: api_url,
            timeout: Duration::from_secs(2),
            ..ApiConfig::default()
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// A running storefront and a cookie-keeping client for it.
///
/// The client does not follow redirects, so tests can assert on them.
pub struct Storefront {
    addr: SocketAddr,
    pub client: reqwest::Client,
}

impl Storefront {
    /// Serve the storefront router against `api_url`, without rate limits.
    pub async fn start(api_url: Url) -> Self {
        let state =
            AppState::new(storefront_config(api_url)).expect("Failed to build storefront state");
        let app = marketstall_storefront::app(state, None);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind storefront");
        let addr = listener.local_addr().expect("Storefront has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            client: Self::new_client(),
        }
    }

    /// A client with an empty cookie jar.
    #[must_use]
    pub fn new_client() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client")
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Storefront request failed")
    }

    /// Submit the login form.
    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/login"))
            .form(&[("username", username), ("password", password)])
            .send()
            .await
            .expect("Login request failed")
    }
}
