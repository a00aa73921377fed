//! Wishlist endpoints.

use bindery_core::ProductId;
use tracing::instrument;

use super::types::{Wishlist, WishlistChange};
use super::{ApiClient, ApiResult};

impl ApiClient {
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_wishlist(&self) -> ApiResult<Wishlist> {
        self.get_json("/api/wishlist/").await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn add_to_wishlist(&self, product_id: ProductId) -> ApiResult<Wishlist> {
        self.post_json("/api/wishlist/add/", &WishlistChange { product_id })
            .await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn remove_from_wishlist(&self, product_id: ProductId) -> ApiResult<Wishlist> {
        self.post_json("/api/wishlist/remove/", &WishlistChange { product_id })
            .await
    }
}
