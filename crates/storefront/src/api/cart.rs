//! Cart endpoints. Every mutation goes through the single upsert call.

use tracing::instrument;

use super::types::{Cart, CartUpsert};
use super::{ApiClient, ApiResult};

impl ApiClient {
    /// Fetch the session's cart, creating it server-side if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> ApiResult<Cart> {
        self.get_json("/cart/").await
    }

    /// Add to, set, or (with quantity 0) remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns the server's message, e.g. when stock is insufficient.
    #[instrument(skip(self))]
    pub async fn upsert_cart_item(&self, upsert: CartUpsert) -> ApiResult<Cart> {
        self.post_json("/cart/", &upsert).await
    }
}
