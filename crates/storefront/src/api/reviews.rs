//! Product reviews and moderation.

use bindery_core::{ProductId, ReviewId};
use tracing::instrument;

use super::types::{NewReview, Review, ReviewAction, ReviewQuery};
use super::{ApiClient, ApiResult};

impl ApiClient {
    /// Approved reviews for one product.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn product_reviews(&self, product: ProductId) -> ApiResult<Vec<Review>> {
        self.get_json_with("/api/reviews/", &ReviewQuery { product })
            .await
    }

    /// Submit a review; it stays hidden until a product manager approves it.
    ///
    /// # Errors
    ///
    /// Returns the server's message, e.g. when the shopper has not bought the product.
    #[instrument(skip(self))]
    pub async fn create_review(&self, review: &NewReview) -> ApiResult<()> {
        self.post_discard("/api/reviews/create/", review).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn pending_reviews(&self) -> ApiResult<Vec<Review>> {
        self.get_json("/api/reviews/pending/").await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn moderate_review(&self, id: ReviewId, action: ReviewAction) -> ApiResult<()> {
        self.post_discard(
            &format!("/api/reviews/{id}/{}/", action.as_path()),
            &serde_json::json!({}),
        )
        .await
    }
}
