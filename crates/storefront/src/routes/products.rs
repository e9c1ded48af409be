//! Product route handlers.
//!
//! Thin JSON views over the cached backend product queries. Credentials are
//! forwarded when the request has them but are never required.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use marketstall_core::{CategoryId, ProductId};

use crate::api::{Page, Product, ProductQuery};
use crate::error::Result;
use crate::middleware::OptionalAuth;
use crate::state::AppState;

/// A product with its effective unit price.
#[derive(Debug, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub unit_price: Decimal,
    pub display_price: String,
    pub in_stock: bool,
    pub tag_list: Vec<String>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let price = product.unit_price();
        Self {
            unit_price: price.amount,
            display_price: price.to_string(),
            in_stock: product.in_stock(),
            tag_list: product.tag_list().map(str::to_owned).collect(),
            product,
        }
    }
}

fn into_views(page: Page<Product>) -> Page<ProductView> {
    Page {
        items: page.items.into_iter().map(ProductView::from).collect(),
        total: page.total,
        page: page.page,
        page_size: page.page_size,
        total_pages: page.total_pages,
        has_next: page.has_next,
        has_previous: page.has_previous,
    }
}

/// Product listing.
#[instrument(skip(state, auth))]
pub async fn index(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Page<ProductView>>> {
    let page = state.api().list_products(auth.as_ref(), &query).await?;
    Ok(Json(into_views(page)))
}

/// Product detail.
#[instrument(skip(state, auth))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductView>> {
    let product = state.api().get_product(auth.as_ref(), id).await?;
    Ok(Json(product.into()))
}

/// All products in a category.
#[instrument(skip(state, auth))]
pub async fn by_category(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Page<ProductView>>> {
    let page = state
        .api()
        .get_products_by_category(auth.as_ref(), category_id)
        .await?;
    Ok(Json(into_views(page)))
}
