//! Local cart route handlers.
//!
//! The local cart lives only in the browser's session and needs no login.

use axum::{Json, extract::Path};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use marketstall_core::{ProductId, Quantity};

use crate::cart::{LineItem, LocalCart, LocalCartAction};
use crate::error::Result;
use crate::middleware::{load_slice, store_slice};
use crate::models::session_keys;

/// Local cart contents.
#[derive(Debug, Serialize)]
pub struct LocalCartView {
    pub items: Vec<LineItem>,
    pub line_count: usize,
    pub total_quantity: u64,
}

impl From<&LocalCart> for LocalCartView {
    fn from(cart: &LocalCart) -> Self {
        Self {
            items: cart.items().to_vec(),
            line_count: cart.line_count(),
            total_quantity: cart.total_quantity(),
        }
    }
}

/// Body of `POST /cart/local/items`.
#[derive(Debug, Deserialize)]
pub struct AddLocalItem {
    pub product_id: ProductId,
    #[serde(default)]
    pub quantity: Quantity,
}

/// Body of `PUT /cart/local/items/{product_id}`.
#[derive(Debug, Deserialize)]
pub struct SetQuantity {
    pub quantity: u32,
}

async fn apply(session: &Session, action: LocalCartAction) -> Result<Json<LocalCartView>> {
    let mut cart: LocalCart = load_slice(session, session_keys::LOCAL_CART).await?;
    cart.reduce(action);
    let view = LocalCartView::from(&cart);
    store_slice(session, session_keys::LOCAL_CART, cart).await?;
    Ok(Json(view))
}

/// Show the local cart.
pub async fn show(session: Session) -> Result<Json<LocalCartView>> {
    let cart: LocalCart = load_slice(&session, session_keys::LOCAL_CART).await?;
    Ok(Json(LocalCartView::from(&cart)))
}

/// Add units of a product, merging with an existing line.
pub async fn add(session: Session, Json(body): Json<AddLocalItem>) -> Result<Json<LocalCartView>> {
    apply(
        &session,
        LocalCartAction::AddItem {
            product_id: body.product_id,
            quantity: body.quantity,
        },
    )
    .await
}

/// Set a line's quantity; zero removes it.
pub async fn update(
    session: Session,
    Path(product_id): Path<ProductId>,
    Json(body): Json<SetQuantity>,
) -> Result<Json<LocalCartView>> {
    apply(
        &session,
        LocalCartAction::UpdateQuantity {
            product_id,
            quantity: body.quantity,
        },
    )
    .await
}

/// Remove a line.
pub async fn remove(
    session: Session,
    Path(product_id): Path<ProductId>,
) -> Result<Json<LocalCartView>> {
    apply(&session, LocalCartAction::RemoveItem(product_id)).await
}

/// Empty the local cart.
pub async fn clear(session: Session) -> Result<Json<LocalCartView>> {
    apply(&session, LocalCartAction::Clear).await
}
