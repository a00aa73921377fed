//! Cart state coordinator.
//!
//! Holds the last cart the API returned plus an observable item count.
//! Every mutation funnels through the single upsert endpoint and replaces
//! the whole snapshot with the server's answer. There is no optimistic
//! update: callers wait for the round trip.

use std::sync::Arc;

use bindery_core::ProductId;
use tokio::sync::watch;
use tracing::instrument;

use crate::api::types::{Cart, CartUpsert};
use crate::api::{ApiClient, ApiError, ApiResult};
use crate::services::loading::Loading;

/// Per-session cart state.
#[derive(Clone)]
pub struct CartCoordinator {
    inner: Arc<CartInner>,
}

struct CartInner {
    api: ApiClient,
    snapshot: watch::Sender<Option<Arc<Cart>>>,
    count: watch::Sender<u32>,
    loading: Loading,
}

impl CartCoordinator {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(CartInner {
                api,
                snapshot: watch::Sender::new(None),
                count: watch::Sender::new(0),
                loading: Loading::default(),
            }),
        }
    }

    /// Load the current cart from the API.
    ///
    /// # Errors
    ///
    /// Returns the API failure; the previous snapshot is kept.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> ApiResult<Arc<Cart>> {
        let _loading = self.inner.loading.start();
        let result = self.inner.api.get_cart().await;
        self.apply(result, "fetch")
    }

    /// Add `quantity` to the product's line, creating it if needed.
    ///
    /// # Errors
    ///
    /// Rejects a zero quantity without a request; otherwise returns the API failure.
    #[instrument(skip(self))]
    pub async fn add(&self, product_id: ProductId, quantity: u32) -> ApiResult<Arc<Cart>> {
        if quantity == 0 {
            return Err(ApiError::Validation(
                "Quantity must be at least 1.".to_string(),
            ));
        }
        self.upsert(CartUpsert {
            product_id,
            quantity,
            replace: false,
        })
        .await
    }

    /// Set the product's line to exactly `quantity`. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns the API failure; the previous snapshot is kept.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, product_id: ProductId, quantity: u32) -> ApiResult<Arc<Cart>> {
        self.upsert(CartUpsert {
            product_id,
            quantity,
            replace: true,
        })
        .await
    }

    /// Remove the product's line.
    ///
    /// # Errors
    ///
    /// Returns the API failure; the previous snapshot is kept.
    pub async fn remove(&self, product_id: ProductId) -> ApiResult<Arc<Cart>> {
        self.set_quantity(product_id, 0).await
    }

    async fn upsert(&self, upsert: CartUpsert) -> ApiResult<Arc<Cart>> {
        let _loading = self.inner.loading.start();
        let result = self.inner.api.upsert_cart_item(upsert).await;
        self.apply(result, "upsert")
    }

    /// Store a successful response; log and pass through a failure.
    fn apply(&self, result: ApiResult<Cart>, operation: &'static str) -> ApiResult<Arc<Cart>> {
        match result {
            Ok(cart) => {
                let cart = Arc::new(cart);
                self.inner.count.send_replace(cart.item_count());
                self.inner.snapshot.send_replace(Some(Arc::clone(&cart)));
                Ok(cart)
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, "Cart request failed");
                Err(e)
            }
        }
    }

    /// Sum of quantities in the last snapshot.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        *self.inner.count.borrow()
    }

    /// Last cart the API returned, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Cart>> {
        self.inner.snapshot.borrow().clone()
    }

    /// Whether any cart request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.loading.is_loading()
    }
}
