//! Catalog management screens: products, stock, genres, reviews, orders.
//!
//! Handlers are generic over the role that guards them, so the same screen
//! serves `/product-manager/...` and `/admin/...`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query},
    response::{IntoResponse, Response},
};
use bindery_core::{GenreId, OrderId, OrderStatus, ReviewId};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;

use super::{Layout, MessageQuery, Notice, redirect_with};
use crate::api::types::{Genre, NewProduct, Order, Product, Review, ReviewAction};
use crate::middleware::guard::{RequireRole, RequiredRole};

// =============================================================================
// Products & stock
// =============================================================================

pub struct ManagedProduct {
    pub slug: String,
    pub title: String,
    pub author: String,
    pub stock: i64,
    pub price: String,
}

impl From<&Product> for ManagedProduct {
    fn from(product: &Product) -> Self {
        Self {
            slug: product.slug.clone(),
            title: product.title.clone(),
            author: product.author.clone(),
            stock: product.stock,
            price: product
                .price
                .map_or_else(|| "Unpriced".to_string(), |p| p.to_string()),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "manage/products.html")]
pub struct ProductsTemplate {
    pub layout: Layout,
    pub base: &'static str,
    pub products: Vec<ManagedProduct>,
}

#[instrument(skip(guard))]
pub async fn products<R: RequiredRole>(
    guard: RequireRole<R>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&guard.shopper, notices);

    let products = match guard.shopper.ctx.api().list_products(None).await {
        Ok(products) => products.iter().map(ManagedProduct::from).collect(),
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    ProductsTemplate {
        layout,
        base: R::BASE_PATH,
        products,
    }
}

#[derive(Debug, Deserialize)]
pub struct StockForm {
    pub change: i64,
}

/// Add to (positive) or take from (negative) a product's stock.
#[instrument(skip(guard))]
pub async fn adjust_stock<R: RequiredRole>(
    guard: RequireRole<R>,
    Path(slug): Path<String>,
    Form(form): Form<StockForm>,
) -> Response {
    let back = format!("{}/products", R::BASE_PATH);
    if form.change == 0 {
        return redirect_with(&back, Notice::Error, "Enter a non-zero stock change.")
            .into_response();
    }

    match guard.shopper.ctx.api().adjust_stock(&slug, form.change).await {
        Ok(level) => redirect_with(
            &back,
            Notice::Success,
            &format!("Stock for {slug} is now {}.", level.stock),
        )
        .into_response(),
        Err(e) => redirect_with(&back, Notice::Error, &e.user_message()).into_response(),
    }
}

#[instrument(skip(guard))]
pub async fn delete_product<R: RequiredRole>(
    guard: RequireRole<R>,
    Path(slug): Path<String>,
) -> Response {
    let back = format!("{}/products", R::BASE_PATH);
    match guard.shopper.ctx.api().delete_product(&slug).await {
        Ok(()) => redirect_with(&back, Notice::Success, "Product deleted.").into_response(),
        Err(e) => redirect_with(&back, Notice::Error, &e.user_message()).into_response(),
    }
}

// =============================================================================
// Product creation
// =============================================================================

/// New product form data, as typed by the product manager.
#[derive(Debug, Default, Deserialize)]
pub struct NewProductForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub isbn: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub publication_date: String,
    #[serde(default)]
    pub pages: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub stock: String,
}

impl NewProductForm {
    /// Check and convert the form. New products start unpriced.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first bad field.
    pub fn parse(&self) -> Result<NewProduct, String> {
        let required = [
            ("title", &self.title),
            ("author", &self.author),
            ("ISBN", &self.isbn),
            ("publisher", &self.publisher),
            ("language", &self.language),
        ];
        if let Some((label, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(format!("Please fill in the {label}."));
        }

        let genre = self
            .genre
            .parse::<GenreId>()
            .map_err(|_| "Please choose a genre.".to_string())?;
        let publication_date = NaiveDate::parse_from_str(self.publication_date.trim(), "%Y-%m-%d")
            .map_err(|_| "Publication date must look like 2024-05-31.".to_string())?;
        let pages = self
            .pages
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| "Pages must be a positive number.".to_string())?;
        let stock = self
            .stock
            .trim()
            .parse::<u32>()
            .map_err(|_| "Stock must be zero or more.".to_string())?;

        Ok(NewProduct {
            title: self.title.trim().to_string(),
            author: self.author.trim().to_string(),
            genre,
            isbn: self.isbn.trim().to_string(),
            description: self.description.trim().to_string(),
            publisher: self.publisher.trim().to_string(),
            publication_date,
            pages,
            language: self.language.trim().to_string(),
            stock,
        })
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "manage/new_product.html")]
pub struct NewProductTemplate {
    pub layout: Layout,
    pub base: &'static str,
    pub genres: Vec<Genre>,
}

#[instrument(skip(guard))]
pub async fn new_product_page<R: RequiredRole>(
    guard: RequireRole<R>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&guard.shopper, notices);

    let genres = match guard.shopper.ctx.api().list_genres().await {
        Ok(genres) => genres,
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    NewProductTemplate {
        layout,
        base: R::BASE_PATH,
        genres,
    }
}

#[instrument(skip(guard))]
pub async fn create_product<R: RequiredRole>(
    guard: RequireRole<R>,
    Form(form): Form<NewProductForm>,
) -> Response {
    let form_path = format!("{}/products/new", R::BASE_PATH);
    let product = match form.parse() {
        Ok(product) => product,
        Err(message) => return redirect_with(&form_path, Notice::Error, &message).into_response(),
    };

    match guard.shopper.ctx.api().create_product(&product).await {
        Ok(created) => redirect_with(
            &format!("{}/products", R::BASE_PATH),
            Notice::Success,
            &format!("Created \"{}\". A sales manager must price it before it sells.", created.title),
        )
        .into_response(),
        Err(e) => redirect_with(&form_path, Notice::Error, &e.user_message()).into_response(),
    }
}

// =============================================================================
// Genres
// =============================================================================

#[derive(Template, WebTemplate)]
#[template(path = "manage/genres.html")]
pub struct GenresTemplate {
    pub layout: Layout,
    pub base: &'static str,
    pub genres: Vec<Genre>,
}

#[instrument(skip(guard))]
pub async fn genres<R: RequiredRole>(
    guard: RequireRole<R>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&guard.shopper, notices);

    let genres = match guard.shopper.ctx.api().list_genres().await {
        Ok(genres) => genres,
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    GenresTemplate {
        layout,
        base: R::BASE_PATH,
        genres,
    }
}

#[derive(Debug, Deserialize)]
pub struct GenreForm {
    #[serde(default)]
    pub name: String,
}

#[instrument(skip(guard))]
pub async fn create_genre<R: RequiredRole>(
    guard: RequireRole<R>,
    Form(form): Form<GenreForm>,
) -> Response {
    let back = format!("{}/genres", R::BASE_PATH);
    let name = form.name.trim();
    if name.is_empty() {
        return redirect_with(&back, Notice::Error, "Genre name cannot be empty.").into_response();
    }

    match guard.shopper.ctx.api().create_genre(name).await {
        Ok(genre) => redirect_with(
            &back,
            Notice::Success,
            &format!("Added genre \"{}\".", genre.name),
        )
        .into_response(),
        Err(e) => redirect_with(&back, Notice::Error, &e.user_message()).into_response(),
    }
}

#[instrument(skip(guard))]
pub async fn delete_genre<R: RequiredRole>(
    guard: RequireRole<R>,
    Path(id): Path<GenreId>,
) -> Response {
    let back = format!("{}/genres", R::BASE_PATH);
    match guard.shopper.ctx.api().delete_genre(id).await {
        Ok(()) => redirect_with(&back, Notice::Success, "Genre deleted.").into_response(),
        Err(e) => redirect_with(&back, Notice::Error, &e.user_message()).into_response(),
    }
}

// =============================================================================
// Review moderation
// =============================================================================

pub struct PendingReview {
    pub id: ReviewId,
    pub author: String,
    pub product: String,
    pub stars: u8,
    pub text: String,
}

impl From<&Review> for PendingReview {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id,
            author: review.username.clone().unwrap_or_default(),
            product: review.product.map(|p| format!("#{p}")).unwrap_or_default(),
            stars: review.stars,
            text: review.review_text.clone(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "manage/reviews.html")]
pub struct ReviewsTemplate {
    pub layout: Layout,
    pub base: &'static str,
    pub reviews: Vec<PendingReview>,
}

#[instrument(skip(guard))]
pub async fn reviews<R: RequiredRole>(
    guard: RequireRole<R>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&guard.shopper, notices);

    let reviews = match guard.shopper.ctx.api().pending_reviews().await {
        Ok(reviews) => reviews.iter().map(PendingReview::from).collect(),
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    ReviewsTemplate {
        layout,
        base: R::BASE_PATH,
        reviews,
    }
}

#[instrument(skip(guard))]
pub async fn moderate_review<R: RequiredRole>(
    guard: RequireRole<R>,
    Path((id, action)): Path<(ReviewId, ReviewAction)>,
) -> Response {
    let back = format!("{}/reviews", R::BASE_PATH);
    match guard.shopper.ctx.api().moderate_review(id, action).await {
        Ok(()) => {
            let message = match action {
                ReviewAction::Approve => "Review approved.",
                ReviewAction::Reject => "Review rejected.",
            };
            redirect_with(&back, Notice::Success, message).into_response()
        }
        Err(e) => redirect_with(&back, Notice::Error, &e.user_message()).into_response(),
    }
}

// =============================================================================
// Orders
// =============================================================================

pub struct ManagedOrder {
    pub id: OrderId,
    pub customer: String,
    pub date: String,
    pub total: String,
    pub status: &'static str,
    pub lines: Vec<String>,
    /// Statuses offered as next steps, from the static transition table.
    pub transitions: Vec<&'static str>,
}

impl From<&Order> for ManagedOrder {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            customer: order.customer.clone().unwrap_or_default(),
            date: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            total: order.total.to_string(),
            status: order.status.as_str(),
            lines: order
                .items
                .iter()
                .map(|item| format!("{} x {}", item.product_title, item.quantity))
                .collect(),
            transitions: order
                .status
                .allowed_transitions()
                .iter()
                .map(OrderStatus::as_str)
                .collect(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "manage/orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub base: &'static str,
    pub orders: Vec<ManagedOrder>,
}

#[instrument(skip(guard))]
pub async fn orders<R: RequiredRole>(
    guard: RequireRole<R>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&guard.shopper, notices);

    let orders = match guard.shopper.ctx.api().all_orders().await {
        Ok(orders) => orders.iter().map(ManagedOrder::from).collect(),
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    OrdersTemplate {
        layout,
        base: R::BASE_PATH,
        orders,
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Move an order to a new status. The API enforces the transition.
#[instrument(skip(guard))]
pub async fn update_order_status<R: RequiredRole>(
    guard: RequireRole<R>,
    Path(id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Response {
    let back = format!("{}/orders", R::BASE_PATH);
    let Ok(status) = form.status.parse::<OrderStatus>() else {
        return redirect_with(&back, Notice::Error, "Unknown order status.").into_response();
    };

    match guard.shopper.ctx.api().update_order_status(id, status).await {
        Ok(()) => redirect_with(
            &back,
            Notice::Success,
            &format!("Order #{id} is now {status}."),
        )
        .into_response(),
        Err(e) => redirect_with(&back, Notice::Error, &e.user_message()).into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form() -> NewProductForm {
        NewProductForm {
            title: "Dune".to_string(),
            author: "Frank Herbert".to_string(),
            genre: "3".to_string(),
            isbn: "9780441013593".to_string(),
            description: "Spice.".to_string(),
            publisher: "Ace".to_string(),
            publication_date: "1965-08-01".to_string(),
            pages: "412".to_string(),
            language: "English".to_string(),
            stock: "10".to_string(),
        }
    }

    #[test]
    fn test_parse_valid_form() {
        let product = form().parse().unwrap();
        assert_eq!(product.genre, GenreId::new(3));
        assert_eq!(product.pages, 412);
        assert_eq!(product.stock, 10);
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        let mut bad = form();
        bad.publisher = " ".to_string();
        assert_eq!(bad.parse().unwrap_err(), "Please fill in the publisher.");

        let mut bad = form();
        bad.genre = String::new();
        assert_eq!(bad.parse().unwrap_err(), "Please choose a genre.");

        let mut bad = form();
        bad.pages = "0".to_string();
        assert!(bad.parse().is_err());

        let mut bad = form();
        bad.publication_date = "08/01/1965".to_string();
        assert!(bad.parse().is_err());
    }

    #[test]
    fn test_transitions_follow_table() {
        let order: Order = serde_json::from_value(serde_json::json!({
            "id": 1, "total": "5.00", "status": "Processing",
            "created_at": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(ManagedOrder::from(&order).transitions, ["Shipped", "Cancelled"]);
    }
}
