//! Products and genres.

use bindery_core::GenreId;
use rust_decimal::Decimal;
use tracing::instrument;

use super::types::{
    DiscountRequest, Genre, NewGenre, NewProduct, PriceChange, Product, ProductSearch,
    StockChange, StockLevel,
};
use super::{ApiClient, ApiResult};

impl ApiClient {
    /// List products, optionally filtered by a search term.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self, search: Option<&str>) -> ApiResult<Vec<Product>> {
        match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(search) => {
                self.get_json_with("/api/products/", &ProductSearch { search })
                    .await
            }
            None => self.get_json("/api/products/").await,
        }
    }

    /// # Errors
    ///
    /// Returns error if the request fails or the slug is unknown.
    #[instrument(skip(self))]
    pub async fn get_product(&self, slug: &str) -> ApiResult<Product> {
        self.get_json(&product_path(slug, "")).await
    }

    /// Products created without a price, awaiting a sales manager.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn pending_products(&self) -> ApiResult<Vec<Product>> {
        self.get_json("/api/products/pending/").await
    }

    /// # Errors
    ///
    /// Returns the server's field errors on rejected input.
    #[instrument(skip(self))]
    pub async fn create_product(&self, product: &NewProduct) -> ApiResult<Product> {
        self.post_json("/api/products/", product).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, slug: &str) -> ApiResult<()> {
        self.delete(&product_path(slug, "")).await
    }

    /// Change stock by a signed delta and return the new level.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, slug: &str, change: i64) -> ApiResult<StockLevel> {
        self.post_json(&product_path(slug, "adjust_stock/"), &StockChange { change })
            .await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn set_price(&self, slug: &str, price: Decimal) -> ApiResult<()> {
        self.post_discard(&product_path(slug, "set_price/"), &PriceChange { price })
            .await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn apply_discount(&self, discount: &DiscountRequest) -> ApiResult<()> {
        self.post_discard("/api/products/apply_discount/", discount)
            .await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_genres(&self) -> ApiResult<Vec<Genre>> {
        self.get_json("/api/genres/").await
    }

    /// # Errors
    ///
    /// Returns the server's message, e.g. for a duplicate name.
    #[instrument(skip(self))]
    pub async fn create_genre(&self, name: &str) -> ApiResult<Genre> {
        self.post_json("/api/genres/", &NewGenre { name }).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn delete_genre(&self, id: GenreId) -> ApiResult<()> {
        self.delete(&format!("/api/genres/{id}/")).await
    }
}

/// `/api/products/{slug}/{suffix}` with the slug percent-encoded.
fn product_path(slug: &str, suffix: &str) -> String {
    format!("/api/products/{}/{suffix}", urlencoding::encode(slug))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_path_encodes_slug() {
        assert_eq!(product_path("dune", ""), "/api/products/dune/");
        assert_eq!(
            product_path("a b", "adjust_stock/"),
            "/api/products/a%20b/adjust_stock/"
        );
    }
}
