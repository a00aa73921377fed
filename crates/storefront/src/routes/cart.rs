//! Cart route handlers.
//!
//! Every change goes through the session's cart coordinator and then
//! redirects, so the next page renders the server's cart.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::Query,
    response::{IntoResponse, Response},
};
use bindery_core::ProductId;
use serde::Deserialize;
use tracing::instrument;

use super::{Layout, MessageQuery, Notice, redirect_with, safe_next};
use crate::api::types::{Cart, CartItem};
use crate::error::add_breadcrumb;
use crate::middleware::auth::Shopper;

/// Cart item display data for templates.
pub struct CartItemView {
    pub product_id: ProductId,
    pub title: String,
    pub quantity: u32,
    pub price: String,
    pub original_price: Option<String>,
    pub line_price: String,
    pub max_quantity: Option<i64>,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product,
            title: item.product_title.clone(),
            quantity: item.quantity,
            price: item.unit_price().to_string(),
            original_price: item
                .discounted_price
                .filter(|discounted| *discounted != item.product_price)
                .map(|_| item.product_price.to_string()),
            line_price: item.total_price.to_string(),
            max_quantity: item.stock,
        }
    }
}

/// Cart display data for templates.
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: String,
    pub item_count: u32,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total: "$0.00".to_string(),
            item_count: 0,
        }
    }
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart.items.iter().map(CartItemView::from).collect(),
            total: cart.total.to_string(),
            item_count: cart.item_count(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
    pub next: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

/// Cart count badge fragment template.
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display cart page.
#[instrument(skip(shopper))]
pub async fn show(shopper: Shopper, Query(notices): Query<MessageQuery>) -> impl IntoResponse {
    let cart = shopper.ctx.cart();

    let (view, error) = match cart.fetch().await {
        Ok(fresh) => (CartView::from(fresh.as_ref()), None),
        Err(e) => {
            // Fall back to the last known cart
            let view = cart
                .snapshot()
                .map_or_else(CartView::empty, |snapshot| CartView::from(snapshot.as_ref()));
            (view, Some(e.user_message()))
        }
    };

    let mut layout = Layout::new(&shopper, notices);
    if let Some(message) = error {
        layout = layout.with_error(message);
    }

    CartShowTemplate { layout, cart: view }
}

/// Add item to cart.
#[instrument(skip(shopper))]
pub async fn add(shopper: Shopper, Form(form): Form<AddToCartForm>) -> Response {
    let next = safe_next(form.next.as_deref(), "/cart");
    let quantity = form.quantity.unwrap_or(1);

    match shopper.ctx.cart().add(form.product_id, quantity).await {
        Ok(_) => {
            let product_id = form.product_id.to_string();
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", product_id.as_str())]),
            );
            redirect_with(next, Notice::Success, "Added to cart.").into_response()
        }
        Err(e) => redirect_with(next, Notice::Error, &e.user_message()).into_response(),
    }
}

/// Set a line's quantity. Zero removes the line.
#[instrument(skip(shopper))]
pub async fn update(shopper: Shopper, Form(form): Form<UpdateCartForm>) -> Response {
    match shopper
        .ctx
        .cart()
        .set_quantity(form.product_id, form.quantity)
        .await
    {
        Ok(_) => redirect_with("/cart", Notice::Success, "Cart updated.").into_response(),
        Err(e) => redirect_with("/cart", Notice::Error, &e.user_message()).into_response(),
    }
}

/// Remove a line.
#[instrument(skip(shopper))]
pub async fn remove(shopper: Shopper, Form(form): Form<RemoveFromCartForm>) -> Response {
    match shopper.ctx.cart().remove(form.product_id).await {
        Ok(_) => redirect_with("/cart", Notice::Success, "Item removed.").into_response(),
        Err(e) => redirect_with("/cart", Notice::Error, &e.user_message()).into_response(),
    }
}

/// Cart count badge, from the last known cart.
#[instrument(skip(shopper))]
pub async fn count(shopper: Shopper) -> impl IntoResponse {
    CartCountTemplate {
        count: shopper.ctx.cart().item_count(),
    }
}
