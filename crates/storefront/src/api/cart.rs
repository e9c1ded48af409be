//! Server-side cart operations.
//!
//! Listings are cached per principal under [`CacheTag::Cart`]; every
//! mutation evicts the whole tag.

use tracing::{debug, instrument};

use marketstall_core::CartId;

use super::endpoints::{CART_ADD_ITEM, CART_CREATE, CARTS};
use super::types::{AddItemRequest, CartSummary, CreateCartRequest, CreatedCart, Listing, Page};
use super::{ApiClient, ApiError, Authorization, CacheKey, CacheTag, CacheValue};

impl ApiClient {
    /// List the principal's carts, optionally with their items.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::AuthRequired`] without a valid session, or an
    /// error if the request fails.
    #[instrument(skip(self, auth))]
    pub async fn list_carts(
        &self,
        auth: &Authorization,
        get_items: bool,
    ) -> Result<Page<CartSummary>, ApiError> {
        let cache_key = CacheKey::Carts {
            principal: auth.principal(),
            with_items: get_items,
        };
        if let Some(CacheValue::Carts(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for carts");
            return Ok(page);
        }

        let mut url = self.endpoint(CARTS)?;
        url.query_pairs_mut()
            .append_pair("get_items", if get_items { "true" } else { "false" });

        let listing: Listing<CartSummary> =
            self.send_json(auth.apply(self.http().get(url))).await?;
        let page = Page::from(listing);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Carts(page.clone()))
            .await;

        Ok(page)
    }

    /// Create a cart and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the cart or the request fails.
    #[instrument(skip(self, auth, request), fields(name = %request.name))]
    pub async fn create_cart(
        &self,
        auth: &Authorization,
        request: &CreateCartRequest,
    ) -> Result<CartId, ApiError> {
        let url = self.endpoint(CART_CREATE)?;
        let result: Result<CreatedCart, ApiError> = self
            .send_json(auth.apply(self.http().post(url).json(request)))
            .await;

        // The backend may have committed even if the response was unreadable.
        self.invalidate(CacheTag::Cart);

        let id = result?.id();
        tracing::info!(cart_id = %id, "Created cart");
        Ok(id)
    }

    /// Add a product to a cart.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] for an unknown cart or product, or an
    /// error if the request fails.
    #[instrument(
        skip(self, auth, request),
        fields(cart_id = %request.cart_id, product_id = %request.product_id)
    )]
    pub async fn add_item(
        &self,
        auth: &Authorization,
        request: &AddItemRequest,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(CART_ADD_ITEM)?;
        let result = self
            .send(auth.apply(self.http().post(url).json(request)))
            .await;

        self.invalidate(CacheTag::Cart);

        result.map(|_| ())
    }
}
