//! Cache types for backend query responses.
//!
//! Every cached query carries a [`CacheTag`]. Mutations invalidate a whole
//! tag at once, so a cart listing fetched before `add-item` is never served
//! after it.

use marketstall_core::{CategoryId, ProductId};

use super::auth::Principal;
use super::types::{CartSummary, Page, Product, ProductQuery};

/// Invalidation group of a cached response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTag {
    Product,
    Cart,
}

/// Cache key for backend queries.
///
/// Cart listings are per principal; see [`super::Authorization::principal`].
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products(ProductQuery),
    Product(ProductId),
    ProductsByCategory(CategoryId),
    Carts {
        principal: Principal,
        with_items: bool,
    },
}

impl CacheKey {
    /// The tag a mutation must invalidate to evict this entry.
    #[must_use]
    pub const fn tag(&self) -> CacheTag {
        match self {
            Self::Products(_) | Self::Product(_) | Self::ProductsByCategory(_) => {
                CacheTag::Product
            }
            Self::Carts { .. } => CacheTag::Cart,
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Page<Product>),
    Product(Box<Product>),
    Carts(Page<CartSummary>),
}
