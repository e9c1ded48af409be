//! Default cart selection.
//!
//! Every user works against one server-side cart named `default`. On first
//! use the initializer finds it, creating it when missing, and selects its
//! id into the caller's [`DefaultCartSlice`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, Utc};
use moka::future::Cache;
use tokio::sync::Mutex;
use tracing::instrument;

use marketstall_core::{CartId, CartName};

use crate::api::{
    ApiClient, ApiError, Authorization, CartSummary, CreateCartRequest, Page, Principal,
};

use super::store::{DefaultCartAction, DefaultCartSlice};

/// How long an idle per-principal lock is kept.
const LOCK_IDLE: Duration = Duration::from_secs(10 * 60);

/// Errors from default cart initialization.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// Listing carts failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// No default cart existed and creating one failed.
    #[error("Failed to create default cart: {0}")]
    CreateFailed(#[source] ApiError),

    /// An operation needed a default cart but none is selected.
    #[error("No default cart selected")]
    DefaultCartMissing,
}

impl CartError {
    /// The backend error underneath, if any.
    #[must_use]
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) | Self::CreateFailed(e) => Some(e),
            Self::DefaultCartMissing => None,
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.api_error().is_some_and(ApiError::is_transient)
    }
}

/// The cart operations initialization needs.
pub trait CartBackend: Send + Sync {
    fn list_carts(
        &self,
        auth: &Authorization,
        get_items: bool,
    ) -> impl Future<Output = Result<Page<CartSummary>, ApiError>> + Send;

    fn create_cart(
        &self,
        auth: &Authorization,
        request: &CreateCartRequest,
    ) -> impl Future<Output = Result<CartId, ApiError>> + Send;
}

impl CartBackend for ApiClient {
    fn list_carts(
        &self,
        auth: &Authorization,
        get_items: bool,
    ) -> impl Future<Output = Result<Page<CartSummary>, ApiError>> + Send {
        Self::list_carts(self, auth, get_items)
    }

    fn create_cart(
        &self,
        auth: &Authorization,
        request: &CreateCartRequest,
    ) -> impl Future<Output = Result<CartId, ApiError>> + Send {
        Self::create_cart(self, auth, request)
    }
}

/// How the default cart was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// A cart named `default` already existed.
    Existing(CartId),
    /// No default cart existed; this one was just created.
    Created(CartId),
}

impl InitOutcome {
    #[must_use]
    pub const fn cart_id(self) -> CartId {
        match self {
            Self::Existing(id) | Self::Created(id) => id,
        }
    }
}

/// Finds or creates each user's default cart.
///
/// Cheaply cloneable. Runs for the same principal are serialized, so two
/// concurrent first requests never both create a cart.
#[derive(Clone)]
pub struct CartInitializer {
    reminder_days: u32,
    locks: Cache<Principal, Arc<Mutex<()>>>,
}

impl CartInitializer {
    /// Create an initializer whose new carts remind `reminder_days` days out.
    #[must_use]
    pub fn new(reminder_days: u32) -> Self {
        Self {
            reminder_days,
            locks: Cache::builder().time_to_idle(LOCK_IDLE).build(),
        }
    }

    /// Find or create the default cart and select it into `slice`.
    ///
    /// On error nothing is selected.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::Api`] if the carts cannot be listed and
    /// [`CartError::CreateFailed`] if a missing default cart cannot be
    /// created.
    #[instrument(skip_all, fields(principal = %auth.principal()))]
    pub async fn initialize<B: CartBackend>(
        &self,
        backend: &B,
        auth: &Authorization,
        slice: &mut DefaultCartSlice,
    ) -> Result<InitOutcome, CartError> {
        let lock = self
            .locks
            .get_with(auth.principal(), async { Arc::new(Mutex::new(())) })
            .await;
        let _guard = lock.lock().await;

        let carts = backend.list_carts(auth, false).await?;

        let outcome = if let Some(id) = select_default(&carts.items) {
            InitOutcome::Existing(id)
        } else {
            let request = CreateCartRequest {
                name: CartName::default_cart(),
                reminder_date: reminder_date(Utc::now(), self.reminder_days),
            };
            let id = backend.create_cart(auth, &request).await.map_err(|e| {
                tracing::error!(error = %e, "Failed to create default cart");
                CartError::CreateFailed(e)
            })?;
            InitOutcome::Created(id)
        };

        slice.reduce(DefaultCartAction::SetDefaultCart(outcome.cart_id()));
        tracing::debug!(?outcome, "Default cart selected");

        Ok(outcome)
    }

    /// The selected default cart, initializing first if none is selected.
    ///
    /// # Errors
    ///
    /// See [`Self::initialize`].
    pub async fn ensure<B: CartBackend>(
        &self,
        backend: &B,
        auth: &Authorization,
        slice: &mut DefaultCartSlice,
    ) -> Result<CartId, CartError> {
        if let Some(id) = slice.default_cart {
            return Ok(id);
        }
        Ok(self.initialize(backend, auth, slice).await?.cart_id())
    }
}

/// The default cart among `carts`; the lowest id wins if there are several.
fn select_default(carts: &[CartSummary]) -> Option<CartId> {
    let mut defaults = carts.iter().filter(|cart| cart.is_default()).map(|cart| cart.id);
    let first = defaults.next()?;
    let rest: Vec<CartId> = defaults.collect();
    if rest.is_empty() {
        return Some(first);
    }

    let lowest = rest.iter().copied().fold(first, CartId::min);
    tracing::warn!(
        count = rest.len() + 1,
        selected = %lowest,
        "Multiple default carts found"
    );
    Some(lowest)
}

/// Midnight UTC, `days` days after `now`'s date.
fn reminder_date(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    now.date_naive()
        .checked_add_days(Days::new(u64::from(days)))
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}
