//! Product queries.

use tracing::{debug, instrument};

use marketstall_core::{CategoryId, ProductId};

use super::endpoints::{PRODUCTS, PRODUCTS_BY_CATEGORY, PRODUCT_BY_ID};
use super::types::{Listing, Page, Product, ProductQuery};
use super::{ApiClient, ApiError, Authorization, CacheKey, CacheValue};

/// Product reads are public; credentials are forwarded when present.
fn with_auth(
    request: reqwest::RequestBuilder,
    auth: Option<&Authorization>,
) -> reqwest::RequestBuilder {
    match auth {
        Some(auth) => auth.apply(request),
        None => request,
    }
}

impl ApiClient {
    /// List products matching `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, auth))]
    pub async fn list_products(
        &self,
        auth: Option<&Authorization>,
        query: &ProductQuery,
    ) -> Result<Page<Product>, ApiError> {
        let cache_key = CacheKey::Products(query.clone());
        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let mut url = self.endpoint(PRODUCTS)?;
        let pairs = query.to_pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }

        let listing: Listing<Product> = self
            .send_json(with_auth(self.http().get(url), auth))
            .await?;
        let page = Page::from(listing);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }

    /// Get a single product.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the product does not exist, or an
    /// error if the request fails.
    #[instrument(skip(self, auth), fields(product_id = %id))]
    pub async fn get_product(
        &self,
        auth: Option<&Authorization>,
        id: ProductId,
    ) -> Result<Product, ApiError> {
        let cache_key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let url = self.endpoint(&format!("{PRODUCT_BY_ID}/{id}"))?;
        let product: Product = self
            .send_json(with_auth(self.http().get(url), auth))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List all products in a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, auth), fields(category_id = %category_id))]
    pub async fn get_products_by_category(
        &self,
        auth: Option<&Authorization>,
        category_id: CategoryId,
    ) -> Result<Page<Product>, ApiError> {
        let cache_key = CacheKey::ProductsByCategory(category_id);
        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for category products");
            return Ok(page);
        }

        let mut url = self.endpoint(PRODUCTS_BY_CATEGORY)?;
        url.query_pairs_mut()
            .append_pair("category_id", &category_id.to_string());

        let listing: Listing<Product> = self
            .send_json(with_auth(self.http().get(url), auth))
            .await?;
        let page = Page::from(listing);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }
}
