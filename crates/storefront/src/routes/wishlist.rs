//! Wishlist route handlers.
//!
//! Signed-out shoppers never reach the API from here: the coordinator
//! refuses and the shopper gets an informational notice.

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
use crate::api::ApiError;
use crate::api::types::WishlistItem;
use crate::middleware::auth::Shopper;

/// Notice shown when a signed-out shopper touches the wishlist.
pub const LOGIN_FOR_WISHLIST: &str = "Please log in to use your wishlist.";

pub struct WishlistItemView {
    pub product_id: ProductId,
    pub slug: String,
    pub title: String,
    pub price: String,
}

impl From<&WishlistItem> for WishlistItemView {
    fn from(item: &WishlistItem) -> Self {
        let product = &item.product;
        Self {
            product_id: product.id,
            slug: product.slug.clone(),
            title: product.title.clone(),
            price: product
                .discounted_price
                .or(product.product_price)
                .map(|p| p.to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "wishlist/show.html")]
pub struct WishlistTemplate {
    pub layout: Layout,
    pub items: Vec<WishlistItemView>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub product_id: ProductId,
    pub next: Option<String>,
}

/// Display the wishlist.
#[instrument(skip(shopper))]
pub async fn show(shopper: Shopper, Query(notices): Query<MessageQuery>) -> impl IntoResponse {
    let mut layout = Layout::new(&shopper, notices);

    let items = match shopper.ctx.wishlist().fetch().await {
        Ok(Some(wishlist)) => wishlist.items.iter().map(WishlistItemView::from).collect(),
        Ok(None) => {
            layout = layout.with_info(LOGIN_FOR_WISHLIST);
            Vec::new()
        }
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    WishlistTemplate { layout, items }
}

/// Add or remove a product.
#[instrument(skip(shopper))]
pub async fn toggle(shopper: Shopper, Form(form): Form<ToggleForm>) -> Response {
    let next = safe_next(form.next.as_deref(), "/wishlist");
    let wishlist = shopper.ctx.wishlist();
    let was_listed = wishlist.contains(form.product_id);

    match wishlist.toggle(form.product_id).await {
        Ok(_) if was_listed => {
            redirect_with(next, Notice::Success, "Removed from your wishlist.").into_response()
        }
        Ok(_) => redirect_with(next, Notice::Success, "Added to your wishlist.").into_response(),
        Err(ApiError::NotAuthenticated) => {
            redirect_with(next, Notice::Info, LOGIN_FOR_WISHLIST).into_response()
        }
        Err(e) => redirect_with(next, Notice::Error, &e.user_message()).into_response(),
    }
}
