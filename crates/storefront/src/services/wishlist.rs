//! Wishlist state coordinator.
//!
//! Same shape as the cart coordinator, gated by an authentication flag it
//! does not own. While the flag is false no request is ever sent and the
//! local snapshot is empty.

use std::sync::{Arc, Weak};

use bindery_core::ProductId;
use tokio::sync::watch;
use tracing::instrument;

use crate::api::types::Wishlist;
use crate::api::{ApiClient, ApiError, ApiResult};
use crate::services::loading::Loading;

#[derive(Clone)]
pub struct WishlistCoordinator {
    inner: Arc<WishlistInner>,
}

struct WishlistInner {
    api: ApiClient,
    authenticated: watch::Receiver<bool>,
    snapshot: watch::Sender<Option<Arc<Wishlist>>>,
    loading: Loading,
}

impl WishlistCoordinator {
    /// Create a coordinator that follows `authenticated`.
    ///
    /// A background task refetches when the flag turns true and clears the
    /// snapshot when it turns false. The task ends once the coordinator or
    /// the flag's sender is dropped. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(api: ApiClient, authenticated: watch::Receiver<bool>) -> Self {
        let coordinator = Self {
            inner: Arc::new(WishlistInner {
                api,
                authenticated: authenticated.clone(),
                snapshot: watch::Sender::new(None),
                loading: Loading::default(),
            }),
        };

        tokio::spawn(follow_auth(Arc::downgrade(&coordinator.inner), authenticated));

        coordinator
    }

    fn is_authenticated(&self) -> bool {
        *self.inner.authenticated.borrow()
    }

    /// Load the wishlist. Returns `Ok(None)` without a request when signed out.
    ///
    /// # Errors
    ///
    /// Returns the API failure; the previous snapshot is kept.
    #[instrument(skip(self))]
    pub async fn fetch(&self) -> ApiResult<Option<Arc<Wishlist>>> {
        if !self.is_authenticated() {
            return Ok(None);
        }
        let _loading = self.inner.loading.start();
        let result = self.inner.api.get_wishlist().await;
        self.inner.apply(result, "fetch").map(Some)
    }

    /// # Errors
    ///
    /// `NotAuthenticated` without a request when signed out, else the API failure.
    #[instrument(skip(self))]
    pub async fn add(&self, product_id: ProductId) -> ApiResult<Arc<Wishlist>> {
        if !self.is_authenticated() {
            return Err(ApiError::NotAuthenticated);
        }
        let _loading = self.inner.loading.start();
        let result = self.inner.api.add_to_wishlist(product_id).await;
        self.inner.apply(result, "add")
    }

    /// # Errors
    ///
    /// `NotAuthenticated` without a request when signed out, else the API failure.
    #[instrument(skip(self))]
    pub async fn remove(&self, product_id: ProductId) -> ApiResult<Arc<Wishlist>> {
        if !self.is_authenticated() {
            return Err(ApiError::NotAuthenticated);
        }
        let _loading = self.inner.loading.start();
        let result = self.inner.api.remove_from_wishlist(product_id).await;
        self.inner.apply(result, "remove")
    }

    /// Add the product if absent from the snapshot, otherwise remove it.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a request when signed out, else the API failure.
    pub async fn toggle(&self, product_id: ProductId) -> ApiResult<Arc<Wishlist>> {
        if self.contains(product_id) {
            self.remove(product_id).await
        } else {
            self.add(product_id).await
        }
    }

    /// Membership in the last fetched snapshot. Always false when signed out.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.is_authenticated()
            && self
                .inner
                .snapshot
                .borrow()
                .as_ref()
                .is_some_and(|wishlist| wishlist.contains(product_id))
    }

    /// Last fetched wishlist. `None` when signed out, even before the
    /// background clear has run.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<Wishlist>> {
        if !self.is_authenticated() {
            return None;
        }
        self.inner.snapshot.borrow().clone()
    }

    /// Whether any wishlist request is in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.loading.is_loading()
    }

    /// Drop the local snapshot. The server copy is untouched.
    pub fn clear(&self) {
        self.inner.clear();
    }
}

impl WishlistInner {
    fn apply(&self, result: ApiResult<Wishlist>, operation: &'static str) -> ApiResult<Arc<Wishlist>> {
        match result {
            Ok(wishlist) => {
                let wishlist = Arc::new(wishlist);
                self.snapshot.send_replace(Some(Arc::clone(&wishlist)));
                Ok(wishlist)
            }
            Err(e) => {
                tracing::warn!(operation, error = %e, "Wishlist request failed");
                Err(e)
            }
        }
    }

    fn clear(&self) {
        self.snapshot.send_replace(None);
    }
}

async fn follow_auth(inner: Weak<WishlistInner>, mut authenticated: watch::Receiver<bool>) {
    while authenticated.changed().await.is_ok() {
        let Some(inner) = inner.upgrade() else {
            break;
        };

        let signed_in = *authenticated.borrow_and_update();
        if signed_in {
            let _loading = inner.loading.start();
            let result = inner.api.get_wishlist().await;
            // Best effort; a failure is already logged.
            let _ = inner.apply(result, "refetch");
        } else {
            inner.clear();
        }
    }
}
