//! Server-side cart route handlers.
//!
//! Every handler here works against the user's default cart, resolving it on
//! first use and remembering the selection in the session.

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use marketstall_core::{CartId, CurrencyCode, Price, ProductId, Quantity};

use crate::api::{AddItemRequest, Authorization, CartSummary};
use crate::cart::{CartError, DefaultCartAction, DefaultCartSlice};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireSession, load_slice, store_slice};
use crate::models::session_keys;
use crate::state::AppState;

/// Body of `POST /cart/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemBody {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: Quantity,
}

/// Default cart with its items.
#[derive(Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: CartSummary,
    pub total_quantity: u64,
}

/// Response of `POST /cart/items`.
#[derive(Debug, Serialize)]
pub struct ItemAdded {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// The user's default cart id, initializing it if none is selected.
async fn default_cart_id(
    state: &AppState,
    session: &Session,
    auth: &Authorization,
) -> Result<CartId> {
    let mut slice: DefaultCartSlice = load_slice(session, session_keys::DEFAULT_CART).await?;
    let selected = slice.default_cart;

    let id = state
        .initializer()
        .ensure(state.api(), auth, &mut slice)
        .await?;

    if selected != slice.default_cart {
        store_slice(session, session_keys::DEFAULT_CART, slice).await?;
    }
    Ok(id)
}

/// Forget the selected default cart.
pub(crate) async fn reset_default_cart(session: &Session) -> Result<()> {
    let mut slice: DefaultCartSlice = load_slice(session, session_keys::DEFAULT_CART).await?;
    slice.reduce(DefaultCartAction::Reset);
    store_slice(session, session_keys::DEFAULT_CART, slice).await?;
    Ok(())
}

/// The default cart with its items.
///
/// A selection pointing at a cart the backend no longer lists (deleted
/// elsewhere) is dropped and resolved once more.
pub(crate) async fn load_default_cart(
    state: &AppState,
    session: &Session,
    auth: &Authorization,
) -> Result<CartSummary> {
    for _ in 0..2 {
        let id = default_cart_id(state, session, auth).await?;
        let carts = state.api().list_carts(auth, true).await?;
        if let Some(cart) = carts.items.into_iter().find(|cart| cart.id == id) {
            return Ok(cart);
        }

        tracing::warn!(cart_id = %id, "Selected default cart no longer exists");
        reset_default_cart(session).await?;
    }

    Err(CartError::DefaultCartMissing.into())
}

/// Show the default cart.
#[instrument(skip_all, fields(username = %user.username))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireSession { user, auth }: RequireSession,
) -> Result<Json<CartView>> {
    let cart = load_default_cart(&state, &session, &auth).await?;
    Ok(Json(CartView {
        total_quantity: cart.total_quantity(),
        cart,
    }))
}

/// Add a product to the default cart.
#[instrument(skip_all, fields(username = %user.username, product_id = %body.product_id))]
pub async fn add_item(
    State(state): State<AppState>,
    session: Session,
    RequireSession { user, auth }: RequireSession,
    Json(body): Json<AddItemBody>,
) -> Result<(StatusCode, Json<ItemAdded>)> {
    let cart_id = default_cart_id(&state, &session, &auth).await?;

    let request = AddItemRequest {
        cart_id,
        product_id: body.product_id,
        quantity: body.quantity,
    };
    state.api().add_item(&auth, &request).await?;

    let product_id = body.product_id.to_string();
    let quantity = body.quantity.to_string();
    add_breadcrumb(
        "cart",
        "Added item",
        Some(&[
            ("product_id", product_id.as_str()),
            ("quantity", quantity.as_str()),
        ]),
    );

    Ok((
        StatusCode::CREATED,
        Json(ItemAdded {
            cart_id,
            product_id: body.product_id,
            quantity: body.quantity,
        }),
    ))
}

// =============================================================================
// Checkout
// =============================================================================

/// One priced line of a checkout summary.
#[derive(Debug, Serialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: Quantity,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub tax: Decimal,
}

/// Priced summary of the default cart.
#[derive(Debug, Serialize)]
pub struct CheckoutSummary {
    pub cart_id: CartId,
    pub currency: CurrencyCode,
    pub lines: Vec<CheckoutLine>,
    pub item_count: u64,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Price the default cart.
///
/// Prices come from the current product data, not from when the items were
/// added.
#[instrument(skip_all, fields(username = %user.username))]
pub async fn checkout(
    State(state): State<AppState>,
    session: Session,
    RequireSession { user, auth }: RequireSession,
) -> Result<Json<CheckoutSummary>> {
    let cart = load_default_cart(&state, &session, &auth).await?;

    let mut lines = Vec::with_capacity(cart.items.len());
    let mut subtotal = Price::zero(CurrencyCode::INR);
    let mut tax = Decimal::ZERO;

    for item in &cart.items {
        let product = state.api().get_product(Some(&auth), item.product_id).await?;
        let unit = product.unit_price();
        let line_total = unit.times(item.quantity);
        let line_tax = (line_total.amount * product.tax / Decimal::ONE_HUNDRED).round_dp(2);

        subtotal = subtotal.checked_add(line_total).ok_or_else(|| {
            AppError::Internal(format!(
                "currency mismatch on product {}: {:?}",
                product.id, line_total.currency_code
            ))
        })?;
        tax += line_tax;

        lines.push(CheckoutLine {
            product_id: product.id,
            name: product.name,
            quantity: item.quantity,
            unit_price: unit.amount,
            line_total: line_total.amount,
            tax: line_tax,
        });
    }

    Ok(Json(CheckoutSummary {
        cart_id: cart.id,
        currency: subtotal.currency_code,
        item_count: cart.total_quantity(),
        subtotal: subtotal.amount,
        tax,
        total: subtotal.amount + tax,
        lines,
    }))
}
