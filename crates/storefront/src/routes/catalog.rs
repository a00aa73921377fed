//! Catalog route handlers: product listing, detail and reviews.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query},
    response::{IntoResponse, Response},
};
use bindery_core::ProductId;
use serde::Deserialize;
use tracing::instrument;

use super::{Layout, MessageQuery, Notice, redirect_with};
use crate::api::types::{NewReview, Product, Review};
use crate::error::Result;
use crate::middleware::auth::{Shopper, SignedIn};

/// Product card display data for templates.
pub struct ProductCard {
    pub id: ProductId,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub price: String,
    /// Undiscounted price, shown struck through when a discount is active.
    pub original_price: Option<String>,
    pub in_stock: bool,
    pub in_wishlist: bool,
}

impl ProductCard {
    fn new(product: &Product, in_wishlist: bool) -> Self {
        Self {
            id: product.id,
            slug: product.slug.clone(),
            title: product.title.clone(),
            author: product.author.clone(),
            price: price_label(product),
            original_price: product
                .has_discount()
                .then(|| product.price.map(|p| p.to_string()))
                .flatten(),
            in_stock: product.in_stock(),
            in_wishlist,
        }
    }
}

fn price_label(product: &Product) -> String {
    product
        .effective_price()
        .map_or_else(|| "Not priced yet".to_string(), |price| price.to_string())
}

/// Review display data for templates.
pub struct ReviewView {
    pub author: String,
    pub stars: u8,
    pub text: String,
    pub date: String,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            author: review
                .username
                .clone()
                .unwrap_or_else(|| "Anonymous".to_string()),
            stars: review.stars,
            text: review.review_text.clone(),
            date: review
                .created_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Query parameters for the catalog page.
#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    /// Location a guard denial came from.
    pub from: Option<String>,
}

/// Catalog page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/index.html")]
pub struct CatalogTemplate {
    pub layout: Layout,
    pub search: String,
    pub products: Vec<ProductCard>,
    pub login_next: Option<String>,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/show.html")]
pub struct ProductTemplate {
    pub layout: Layout,
    pub product: ProductCard,
    pub description: String,
    pub details: Vec<(&'static str, String)>,
    pub stock: i64,
    pub reviews: Vec<ReviewView>,
}

/// Display the catalog.
#[instrument(skip(shopper))]
pub async fn index(
    shopper: Shopper,
    Query(query): Query<CatalogQuery>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&shopper, notices);
    let search = query.search.unwrap_or_default();
    let term = Some(search.trim()).filter(|s| !s.is_empty());

    let mut login_next = None;
    if let Some(from) = query.from {
        layout = if shopper.session.is_authenticated() {
            layout.with_info("You don't have access to that page.")
        } else {
            login_next = Some(urlencoding::encode(&from).into_owned());
            layout.with_info("Please log in to view that page.")
        };
    }

    let wishlist = shopper.ctx.wishlist();
    let products = match shopper.ctx.api().list_products(term).await {
        Ok(products) => products
            .iter()
            .map(|p| ProductCard::new(p, wishlist.contains(p.id)))
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to load products: {e}");
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    CatalogTemplate {
        layout,
        search,
        products,
        login_next,
    }
}

/// Display a product.
#[instrument(skip(shopper))]
pub async fn show(
    shopper: Shopper,
    Path(slug): Path<String>,
    Query(notices): Query<MessageQuery>,
) -> Result<Response> {
    let api = shopper.ctx.api();
    let product = api.get_product(&slug).await?;

    let reviews = match api.product_reviews(product.id).await {
        Ok(reviews) => reviews.iter().map(ReviewView::from).collect(),
        Err(e) => {
            tracing::warn!("Failed to load reviews for {slug}: {e}");
            Vec::new()
        }
    };

    let mut details = Vec::new();
    let optional = [
        ("Genre", product.genre_name.clone()),
        ("Language", product.language.clone()),
        ("ISBN", product.isbn.clone()),
        ("Publisher", product.publisher.clone()),
        ("Published", product.publication_date.clone()),
        ("Pages", product.pages.map(|p| p.to_string())),
        ("Rating", product.rating.map(|r| format!("{r:.1} / 5"))),
    ];
    for (label, value) in optional {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            details.push((label, value));
        }
    }

    Ok(ProductTemplate {
        layout: Layout::new(&shopper, notices),
        product: ProductCard::new(&product, shopper.ctx.wishlist().contains(product.id)),
        description: product.description.clone(),
        details,
        stock: product.stock,
        reviews,
    }
    .into_response())
}

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub product_id: ProductId,
    pub stars: u8,
    #[serde(default)]
    pub review_text: String,
}

/// Submit a review. Reviews appear once a product manager approves them.
#[instrument(skip(shopper))]
pub async fn create_review(
    SignedIn(shopper): SignedIn,
    Path(slug): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Response {
    let back = format!("/products/{}", urlencoding::encode(&slug));

    if !(1..=5).contains(&form.stars) {
        return redirect_with(&back, Notice::Error, "Please pick between 1 and 5 stars.")
            .into_response();
    }

    let review = NewReview {
        product: form.product_id,
        stars: form.stars,
        review_text: form.review_text.trim().to_string(),
    };

    match shopper.ctx.api().create_review(&review).await {
        Ok(()) => redirect_with(
            &back,
            Notice::Success,
            "Thanks! Your review will appear once it is approved.",
        )
        .into_response(),
        Err(e) => redirect_with(&back, Notice::Error, &e.user_message()).into_response(),
    }
}
