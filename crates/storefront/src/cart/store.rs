//! Local cart state.
//!
//! Two slices, each a plain reducer: a value plus `reduce(action)`. Neither
//! does I/O; callers load a slice, reduce it, and store it back, so every
//! slice has exactly one writer at a time.
//!
//! - [`DefaultCartSlice`] remembers which server-side cart is the default.
//! - [`LocalCart`] is a fully local item list, for browsing before login.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketstall_core::{CartId, ProductId, Quantity};

// =============================================================================
// Default cart
// =============================================================================

/// Actions on [`DefaultCartSlice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultCartAction {
    /// Select a server-side cart as the default.
    SetDefaultCart(CartId),
    /// Forget the selection, e.g. on logout.
    Reset,
}

/// The server-selected default cart.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultCartSlice {
    pub default_cart: Option<CartId>,
}

impl DefaultCartSlice {
    /// Apply an action.
    pub const fn reduce(&mut self, action: DefaultCartAction) {
        match action {
            DefaultCartAction::SetDefaultCart(id) => self.default_cart = Some(id),
            DefaultCartAction::Reset => self.default_cart = None,
        }
    }
}

// =============================================================================
// Local cart
// =============================================================================

/// One product line in a [`LocalCart`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub added_at: DateTime<Utc>,
}

/// Actions on [`LocalCart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalCartAction {
    /// Add units; merges into an existing line for the same product.
    AddItem {
        product_id: ProductId,
        quantity: Quantity,
    },
    /// Set a line's quantity. Zero removes the line; unknown products are
    /// ignored.
    UpdateQuantity { product_id: ProductId, quantity: u32 },
    /// Drop a line.
    RemoveItem(ProductId),
    /// Drop every line.
    Clear,
}

/// A cart held entirely on the client side.
///
/// Holds at most one line per product, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalCart {
    items: Vec<LineItem>,
}

impl LocalCart {
    /// Apply an action, stamping new lines with the current time.
    pub fn reduce(&mut self, action: LocalCartAction) {
        self.reduce_at(action, Utc::now());
    }

    /// Apply an action, stamping new lines with `now`.
    pub fn reduce_at(&mut self, action: LocalCartAction, now: DateTime<Utc>) {
        match action {
            LocalCartAction::AddItem {
                product_id,
                quantity,
            } => {
                if let Some(line) = self.line_mut(product_id) {
                    line.quantity = line.quantity.saturating_add(quantity);
                } else {
                    self.items.push(LineItem {
                        product_id,
                        quantity,
                        added_at: now,
                    });
                }
            }
            LocalCartAction::UpdateQuantity {
                product_id,
                quantity,
            } => match Quantity::new(quantity) {
                Ok(quantity) => {
                    if let Some(line) = self.line_mut(product_id) {
                        line.quantity = quantity;
                    }
                }
                Err(_) => self.remove(product_id),
            },
            LocalCartAction::RemoveItem(product_id) => self.remove(product_id),
            LocalCartAction::Clear => self.items.clear(),
        }
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// The line for `product_id`, if any.
    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|line| line.product_id == product_id)
    }

    /// Number of distinct products.
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items
            .iter()
            .map(|line| u64::from(line.quantity.get()))
            .sum()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut LineItem> {
        self.items
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }

    fn remove(&mut self, product_id: ProductId) {
        self.items.retain(|line| line.product_id != product_id);
    }
}

// =============================================================================
// Persistence
// =============================================================================

/// How long persisted client state stays valid.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// A value stamped with the time it was saved.
///
/// Stale values are discarded on load rather than trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persisted<T> {
    pub saved_at: DateTime<Utc>,
    pub value: T,
}

impl<T> Persisted<T> {
    /// Stamp `value` with the current time.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self::at(value, Utc::now())
    }

    #[must_use]
    pub const fn at(value: T, saved_at: DateTime<Utc>) -> Self {
        Self { saved_at, value }
    }

    /// Whether the value is older than `ttl` at `now`.
    ///
    /// A save time in the future (clock skew) counts as fresh.
    #[must_use]
    pub fn is_expired_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        (now - self.saved_at).to_std().is_ok_and(|age| age > ttl)
    }

    /// The value if it is still fresh.
    #[must_use]
    pub fn into_fresh(self, ttl: Duration) -> Option<T> {
        if self.is_expired_at(ttl, Utc::now()) {
            None
        } else {
            Some(self.value)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn add(cart: &mut LocalCart, product: i32, n: u32) {
        cart.reduce(LocalCartAction::AddItem {
            product_id: ProductId::new(product),
            quantity: qty(n),
        });
    }

    #[test]
    fn test_default_cart_slice() {
        let mut slice = DefaultCartSlice::default();
        assert_eq!(slice.default_cart, None);

        slice.reduce(DefaultCartAction::SetDefaultCart(CartId::new(7)));
        assert_eq!(slice.default_cart, Some(CartId::new(7)));

        slice.reduce(DefaultCartAction::SetDefaultCart(CartId::new(8)));
        assert_eq!(slice.default_cart, Some(CartId::new(8)));

        slice.reduce(DefaultCartAction::Reset);
        assert_eq!(slice.default_cart, None);
    }

    #[test]
    fn test_add_to_empty_cart_creates_one_line() {
        let mut cart = LocalCart::default();
        add(&mut cart, 1, 2);

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity.get(), 2);
    }

    #[test]
    fn test_repeated_add_merges() {
        let mut cart = LocalCart::default();
        add(&mut cart, 1, 2);
        add(&mut cart, 1, 2);

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity.get(), 4);
    }

    #[test]
    fn test_merge_keeps_first_added_at() {
        let mut cart = LocalCart::default();
        let first = Utc::now() - TimeDelta::hours(1);
        let action = LocalCartAction::AddItem {
            product_id: ProductId::new(1),
            quantity: qty(1),
        };
        cart.reduce_at(action, first);
        cart.reduce_at(action, Utc::now());

        assert_eq!(cart.get(ProductId::new(1)).unwrap().added_at, first);
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = LocalCart::default();
        add(&mut cart, 1, 2);
        cart.reduce(LocalCartAction::UpdateQuantity {
            product_id: ProductId::new(1),
            quantity: 5,
        });
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_update_quantity_to_zero_removes() {
        let mut cart = LocalCart::default();
        add(&mut cart, 1, 2);
        add(&mut cart, 2, 1);
        cart.reduce(LocalCartAction::UpdateQuantity {
            product_id: ProductId::new(1),
            quantity: 0,
        });

        assert!(cart.get(ProductId::new(1)).is_none());
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_update_unknown_product_is_ignored() {
        let mut cart = LocalCart::default();
        cart.reduce(LocalCartAction::UpdateQuantity {
            product_id: ProductId::new(9),
            quantity: 3,
        });
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cart = LocalCart::default();
        add(&mut cart, 1, 1);
        add(&mut cart, 2, 3);
        add(&mut cart, 3, 1);

        cart.reduce(LocalCartAction::RemoveItem(ProductId::new(2)));
        let ids: Vec<_> = cart.items().iter().map(|l| l.product_id.as_i32()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(cart.total_quantity(), 2);

        cart.reduce(LocalCartAction::Clear);
        assert!(cart.is_empty());
        assert_eq!(cart.total_quantity(), 0);
    }

    #[test]
    fn test_local_cart_serde() {
        let mut cart = LocalCart::default();
        add(&mut cart, 4, 2);
        let json = serde_json::to_string(&cart).unwrap();
        let back: LocalCart = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cart);
    }

    #[test]
    fn test_persisted_expiry() {
        let now = Utc::now();
        let fresh = Persisted::at(DefaultCartSlice::default(), now - TimeDelta::hours(23));
        let stale = Persisted::at(DefaultCartSlice::default(), now - TimeDelta::hours(25));
        let future = Persisted::at(DefaultCartSlice::default(), now + TimeDelta::hours(1));

        assert!(!fresh.is_expired_at(DEFAULT_TTL, now));
        assert!(stale.is_expired_at(DEFAULT_TTL, now));
        assert!(!future.is_expired_at(DEFAULT_TTL, now));
        assert!(stale.into_fresh(DEFAULT_TTL).is_none());
    }
}
