//! Wire types for the commerce backend.
//!
//! These mirror the backend's JSON payloads. Backend-owned values are
//! deserialized leniently (missing optional fields default) since the client
//! holds read-only copies.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use marketstall_core::{
    CartId, CartItemId, CartName, CartStatus, CategoryId, CurrencyCode, Discount, Price,
    ProductId, Quantity, SubCategoryId, UserId,
};

// =============================================================================
// Pagination
// =============================================================================

/// The backend's pagination envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub has_next: bool,
    #[serde(default)]
    pub has_previous: bool,
}

const fn first_page() -> u32 {
    1
}

impl<T> Page<T> {
    /// Wrap a complete, unpaginated list as a single page.
    #[must_use]
    pub fn single(items: Vec<T>) -> Self {
        let len = items.len();
        Self {
            total: u64::try_from(len).unwrap_or(u64::MAX),
            page: 1,
            page_size: u32::try_from(len).unwrap_or(u32::MAX),
            total_pages: u32::from(len > 0),
            has_next: false,
            has_previous: false,
            items,
        }
    }
}

/// A list response that may or may not be paginated.
///
/// Some listing endpoints answer with the pagination envelope, others with
/// a bare JSON array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Listing<T> {
    Paged(Page<T>),
    Bare(Vec<T>),
}

impl<T> From<Listing<T>> for Page<T> {
    fn from(listing: Listing<T>) -> Self {
        match listing {
            Listing::Paged(page) => page,
            Listing::Bare(items) => Self::single(items),
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// A product as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// List price before discount.
    pub price: Decimal,
    #[serde(default)]
    pub slug: String,
    /// Comma-separated tags.
    pub tags: Option<String>,
    #[serde(default)]
    pub discount: Discount,
    /// Tax percentage.
    #[serde(default)]
    pub tax: Decimal,
    #[serde(default)]
    pub stock: u32,
    pub category_id: CategoryId,
    pub sub_category_ids: Option<Vec<SubCategoryId>>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    #[serde(default)]
    pub images: Vec<String>,
    /// Discounted price as computed by the backend.
    pub computed_price: Option<Decimal>,
}

const fn active_by_default() -> bool {
    true
}

impl Product {
    /// Price of one unit after discount.
    ///
    /// Uses the backend's `computed_price` when present.
    #[must_use]
    pub fn unit_price(&self) -> Price {
        self.computed_price.map_or_else(
            || Price::new(self.price, CurrencyCode::INR).discounted(self.discount),
            |amount| Price::new(amount, CurrencyCode::INR),
        )
    }

    /// Whether at least one unit is in stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Individual tags, trimmed, without empties.
    pub fn tag_list(&self) -> impl Iterator<Item = &str> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
    }
}

/// Sort keys accepted by the product listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSortKey {
    Id,
    Name,
    Slug,
    Price,
    Discount,
    Tax,
    Stock,
    CreatedAt,
}

impl ProductSortKey {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Slug => "slug",
            Self::Price => "price",
            Self::Discount => "discount",
            Self::Tax => "tax",
            Self::Stock => "stock",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Filters for the product listing. Unset fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub name: Option<String>,
    pub category_id: Option<CategoryId>,
    pub sub_category_id: Option<SubCategoryId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub is_active: Option<bool>,
    pub sort_by: Option<ProductSortKey>,
    pub sort_order: Option<SortOrder>,
}

impl ProductQuery {
    /// Query-string pairs for the set filters.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("page_size", page_size.to_string()));
        }
        if let Some(name) = &self.name {
            pairs.push(("name", name.clone()));
        }
        if let Some(category_id) = self.category_id {
            pairs.push(("category_id", category_id.to_string()));
        }
        if let Some(sub_category_id) = self.sub_category_id {
            pairs.push(("sub_category_id", sub_category_id.to_string()));
        }
        if let Some(min_price) = self.min_price {
            pairs.push(("min_price", min_price.to_string()));
        }
        if let Some(max_price) = self.max_price {
            pairs.push(("max_price", max_price.to_string()));
        }
        if let Some(is_active) = self.is_active {
            pairs.push(("is_active", is_active.to_string()));
        }
        if let Some(sort_by) = self.sort_by {
            pairs.push(("sort_by", sort_by.as_str().to_string()));
        }
        if let Some(sort_order) = self.sort_order {
            pairs.push(("sort_order", sort_order.as_str().to_string()));
        }
        pairs
    }
}

// =============================================================================
// Carts
// =============================================================================

/// A cart as listed by the backend. `items` is empty unless requested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSummary {
    pub id: CartId,
    pub name: CartName,
    #[serde(default, deserialize_with = "lenient_datetime::deserialize_option")]
    pub reminder_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: CartStatus,
    #[serde(default, deserialize_with = "cart_lines::deserialize")]
    pub items: Vec<CartItem>,
}

impl CartSummary {
    /// Whether this is the conventional default cart.
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.name.is_default()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }
}

/// A line in a server-side cart.
///
/// The backend accepts any integer quantity, so lines with fewer than one
/// unit are dropped when a listing is read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: Option<CartItemId>,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// Body of `POST /cart/create`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateCartRequest {
    pub name: CartName,
    pub reminder_date: Option<DateTime<Utc>>,
}

/// Response of `POST /cart/create`.
///
/// Accepts both `{"id": 1}` and a bare `1`.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub(crate) enum CreatedCart {
    Object { id: CartId },
    Bare(CartId),
}

impl CreatedCart {
    pub(crate) const fn id(self) -> CartId {
        match self {
            Self::Object { id } | Self::Bare(id) => id,
        }
    }
}

/// Body of `POST /cart/add-item`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: Quantity,
}

// =============================================================================
// Users
// =============================================================================

/// The authenticated user, from `GET /users/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<UserId>,
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Raw body of a successful login.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
}

fn bearer() -> String {
    "bearer".to_string()
}

/// Timestamps from the backend may or may not carry an offset.
mod lenient_datetime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        parse(&raw).map(Some).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(with_offset) = DateTime::parse_from_rfc3339(raw) {
            return Ok(with_offset.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("invalid timestamp {raw:?}: {e}"))
    }
}

/// Cart lines as the backend stores them.
mod cart_lines {
    use serde::{Deserialize, Deserializer};

    use marketstall_core::{CartItemId, ProductId, Quantity};

    use super::CartItem;

    #[derive(Deserialize)]
    struct RawLine {
        id: Option<CartItemId>,
        product_id: ProductId,
        quantity: i64,
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<CartItem>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Vec<RawLine>>::deserialize(deserializer)?.unwrap_or_default();
        Ok(raw
            .into_iter()
            .filter_map(|line| match Quantity::try_from(line.quantity) {
                Ok(quantity) => Some(CartItem {
                    id: line.id,
                    product_id: line.product_id,
                    quantity,
                }),
                Err(e) => {
                    tracing::warn!(
                        product_id = %line.product_id,
                        quantity = line.quantity,
                        error = %e,
                        "Skipping cart line"
                    );
                    None
                }
            })
            .collect())
    }
}
