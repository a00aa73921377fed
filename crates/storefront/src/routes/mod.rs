//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Catalog (?search=, ?from= after a guard denial)
//! GET  /health                    - Health check
//!
//! # Products
//! GET  /products/{slug}           - Product detail with reviews
//! POST /products/{slug}/reviews   - Submit a review
//!
//! # Cart
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add quantity to a line
//! POST /cart/update               - Set a line's quantity (0 removes)
//! POST /cart/remove               - Remove a line
//! GET  /cart/count                - Cart count badge (fragment)
//!
//! # Wishlist
//! GET  /wishlist                  - Wishlist page
//! POST /wishlist/toggle           - Add or remove a product
//!
//! # Checkout (requires login)
//! GET  /checkout                  - Address and payment form
//! POST /checkout                  - Save address, place order, pay
//! POST /checkout/pending/{id}     - Pay an order whose payment failed
//! GET  /checkout/invoice          - Invoice of the last payment
//!
//! # Auth
//! GET  /auth/login                - Login page
//! POST /auth/login                - Login action
//! GET  /auth/register             - Register page
//! POST /auth/register             - Register action
//! POST /auth/logout               - Logout action
//!
//! # Profile (requires login)
//! GET  /profile                   - Profile form
//! POST /profile                   - Save profile
//! GET  /profile/orders            - Order history grouped by status
//! POST /profile/orders/{id}/cancel
//! GET  /profile/orders/{id}/refund
//! POST /profile/orders/{id}/refund
//! GET  /profile/transactions
//! GET  /profile/refunds
//!
//! # Product manager (role "product manager"; mirrored under /admin)
//! GET  /product-manager/products
//! GET  /product-manager/products/new
//! POST /product-manager/products/new
//! POST /product-manager/products/{slug}/stock
//! POST /product-manager/products/{slug}/delete
//! GET  /product-manager/genres
//! POST /product-manager/genres
//! POST /product-manager/genres/{id}/delete
//! GET  /product-manager/reviews
//! POST /product-manager/reviews/{id}/{approve|reject}
//! GET  /product-manager/orders
//! POST /product-manager/orders/{id}/status
//! GET  /product-manager/invoices
//! GET  /product-manager/invoices/{id}
//! GET  /product-manager/invoices/{id}/pdf
//!
//! # Sales manager (role "sales manager"; mirrored under /admin)
//! GET  /sales-manager/discounts
//! POST /sales-manager/discounts
//! GET  /sales-manager/pricing
//! POST /sales-manager/pricing/{slug}
//! GET  /sales-manager/refunds
//! POST /sales-manager/refunds/{id}
//! GET  /sales-manager/revenue
//! GET  /sales-manager/invoices[...]
//!
//! # Admin (role "admin")
//! GET  /admin                     - Dashboard
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod invoices;
pub mod manage;
pub mod profile;
pub mod sales;
pub mod wishlist;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use serde::Deserialize;

use crate::middleware::auth::Shopper;
use crate::middleware::guard::RequiredRole;
use crate::middleware::guard::roles::{Admin, ProductManager, SalesManager};
use crate::state::AppState;

// =============================================================================
// Shared view plumbing
// =============================================================================

/// Query parameters for notice display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
    pub info: Option<String>,
}

/// Data every page's layout needs.
pub struct Layout {
    pub username: Option<String>,
    pub signed_in: bool,
    pub cart_count: u32,
    /// Another cart request for this browser is still in flight.
    pub cart_busy: bool,
    pub wishlist_busy: bool,
    pub error: Option<String>,
    pub success: Option<String>,
    pub info: Option<String>,
}

impl Layout {
    #[must_use]
    pub fn new(shopper: &Shopper, notices: MessageQuery) -> Self {
        Self {
            username: shopper.session.username().map(str::to_owned),
            signed_in: shopper.session.is_authenticated(),
            cart_count: shopper.ctx.cart().item_count(),
            cart_busy: shopper.ctx.cart().is_loading(),
            wishlist_busy: shopper.ctx.wishlist().is_loading(),
            error: notices.error,
            success: notices.success,
            info: notices.info,
        }
    }

    /// Layout with an error notice added, keeping any from the query.
    #[must_use]
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_info(mut self, message: impl Into<String>) -> Self {
        self.info = Some(message.into());
        self
    }
}

/// Kind of notice carried on a redirect.
#[derive(Debug, Clone, Copy)]
pub enum Notice {
    Error,
    Success,
    Info,
}

impl Notice {
    const fn key(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Success => "success",
            Self::Info => "info",
        }
    }
}

/// Redirect to `path` with a url-encoded notice.
#[must_use]
pub fn redirect_with(path: &str, notice: Notice, message: &str) -> Redirect {
    let separator = if path.contains('?') { '&' } else { '?' };
    Redirect::to(&format!(
        "{path}{separator}{}={}",
        notice.key(),
        urlencoding::encode(message)
    ))
}

/// Local path to return to after a form post. Anything that is not a plain
/// same-site path falls back to `default`.
#[must_use]
pub fn safe_next<'a>(next: Option<&'a str>, default: &'a str) -> &'a str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => default,
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/{slug}", get(catalog::show))
        .route("/{slug}/reviews", post(catalog::create_review))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/toggle", post(wishlist::toggle))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::show).post(checkout::submit))
        .route("/pending/{order_id}", post(checkout::pay_pending))
        .route("/invoice", get(checkout::invoice))
}

/// Create the profile routes router.
pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(profile::show).post(profile::update))
        .route("/orders", get(profile::orders))
        .route("/orders/{id}/cancel", post(profile::cancel_order))
        .route(
            "/orders/{id}/refund",
            get(profile::refund_form).post(profile::request_refund),
        )
        .route("/transactions", get(profile::transactions))
        .route("/refunds", get(profile::refunds))
}

/// Catalog, stock, review and order screens for role `R`.
fn catalog_management_routes<R: RequiredRole>() -> Router<AppState> {
    Router::new()
        .route("/products", get(manage::products::<R>))
        .route(
            "/products/new",
            get(manage::new_product_page::<R>).post(manage::create_product::<R>),
        )
        .route("/products/{slug}/stock", post(manage::adjust_stock::<R>))
        .route("/products/{slug}/delete", post(manage::delete_product::<R>))
        .route(
            "/genres",
            get(manage::genres::<R>).post(manage::create_genre::<R>),
        )
        .route("/genres/{id}/delete", post(manage::delete_genre::<R>))
        .route("/reviews", get(manage::reviews::<R>))
        .route("/reviews/{id}/{action}", post(manage::moderate_review::<R>))
        .route("/orders", get(manage::orders::<R>))
        .route("/orders/{id}/status", post(manage::update_order_status::<R>))
}

/// Discount, pricing, refund and revenue screens for role `R`.
fn sales_routes<R: RequiredRole>() -> Router<AppState> {
    Router::new()
        .route(
            "/discounts",
            get(sales::discounts::<R>).post(sales::apply_discount::<R>),
        )
        .route("/pricing", get(sales::pricing::<R>))
        .route("/pricing/{slug}", post(sales::set_price::<R>))
        .route("/refunds", get(sales::refunds::<R>))
        .route("/refunds/{id}", post(sales::process_refund::<R>))
        .route("/revenue", get(sales::revenue::<R>))
}

/// Invoice screens for role `R`.
fn invoice_routes<R: RequiredRole>() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(invoices::index::<R>))
        .route("/invoices/{id}", get(invoices::html::<R>))
        .route("/invoices/{id}/pdf", get(invoices::pdf::<R>))
}

/// Create the product manager routes router.
pub fn product_manager_routes() -> Router<AppState> {
    catalog_management_routes::<ProductManager>().merge(invoice_routes::<ProductManager>())
}

/// Create the sales manager routes router.
pub fn sales_manager_routes() -> Router<AppState> {
    sales_routes::<SalesManager>().merge(invoice_routes::<SalesManager>())
}

/// Create the admin routes router. Every screen is the same handler as the
/// role-specific one, guarded by the admin role instead.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(admin::dashboard))
        .merge(catalog_management_routes::<Admin>())
        .merge(sales_routes::<Admin>())
        .merge(invoice_routes::<Admin>())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page (catalog)
        .route("/", get(catalog::index))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/checkout", checkout_routes())
        .nest("/auth", auth_routes())
        .nest("/profile", profile_routes())
        // Back office
        .nest("/product-manager", product_manager_routes())
        .nest("/sales-manager", sales_manager_routes())
        .nest("/admin", admin_routes())
}

#[cfg(test)]
mod tests {
    use axum::response::IntoResponse;

    use super::*;

    fn location(redirect: Redirect) -> String {
        redirect
            .into_response()
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    }

    #[test]
    fn test_redirect_with_encodes_message() {
        assert_eq!(
            location(redirect_with("/cart", Notice::Error, "Out of stock & gone")),
            "/cart?error=Out%20of%20stock%20%26%20gone"
        );
        assert_eq!(
            location(redirect_with("/?search=dune", Notice::Info, "hi")),
            "/?search=dune&info=hi"
        );
    }

    #[test]
    fn test_safe_next_rejects_offsite() {
        assert_eq!(safe_next(Some("/products/dune"), "/"), "/products/dune");
        assert_eq!(safe_next(Some("//evil.example"), "/"), "/");
        assert_eq!(safe_next(Some("https://evil.example"), "/"), "/");
        assert_eq!(safe_next(None, "/cart"), "/cart");
    }
}
