//! Wire types for the bookstore REST API.
//!
//! Response types are lenient: optional fields default when absent, money
//! fields accept strings or numbers, and unknown fields are ignored. Request
//! types serialize exactly the keys the API reads.

use bindery_core::{
    CartId, CartItemId, GenreId, InvoiceId, Money, OrderId, OrderItemId, OrderStatus, ProductId,
    RefundDecision, RefundRequestId, RefundStatus, ReviewId, RoleSet, TransactionId, WishlistId,
    WishlistItemId,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Token pair returned by a successful login.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct LogoutRequest<'a> {
    pub refresh: &'a str,
}

/// Response of the user-info endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserInfo {
    /// Roles folded into the closed role enumeration.
    #[must_use]
    pub fn role_set(&self) -> RoleSet {
        RoleSet::from_names(&self.roles)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopper's cart as the server last reported it.
#[derive(Debug, Clone, Deserialize)]
pub struct Cart {
    pub id: CartId,
    #[serde(default)]
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub total: Money,
}

impl Cart {
    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .map(|item| item.quantity)
            .fold(0, u32::saturating_add)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product: ProductId,
    pub product_title: String,
    pub product_price: Money,
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    #[serde(default)]
    pub discounted_price: Option<Money>,
    pub quantity: u32,
    pub total_price: Money,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
}

impl CartItem {
    /// Unit price after any active discount.
    #[must_use]
    pub fn unit_price(&self) -> Money {
        self.discounted_price.unwrap_or(self.product_price)
    }
}

/// Body of the cart upsert call. `quantity` 0 removes the line; `override`
/// replaces the quantity instead of adding to it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CartUpsert {
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(rename = "override")]
    pub replace: bool,
}

// =============================================================================
// Wishlist
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Wishlist {
    pub id: WishlistId,
    #[serde(default)]
    pub items: Vec<WishlistItem>,
}

impl Wishlist {
    /// Membership by embedded product id.
    #[must_use]
    pub fn contains(&self, product: ProductId) -> bool {
        self.items.iter().any(|item| item.product.id == product)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub product: WishlistProduct,
}

/// Product summary embedded in a wishlist line.
#[derive(Debug, Clone, Deserialize)]
pub struct WishlistProduct {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub product_price: Option<Money>,
    #[serde(default)]
    pub product_cover_image: Option<String>,
    #[serde(default)]
    pub discounted_price: Option<Money>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct WishlistChange {
    pub product_id: ProductId,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub genre: Option<GenreId>,
    #[serde(default)]
    pub genre_name: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub description: String,
    /// `None` until a sales manager prices a newly created product.
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default)]
    pub discount_percent: Option<Decimal>,
    #[serde(default)]
    pub discounted_price: Option<Money>,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub pages: Option<u32>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

impl Product {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Price a shopper pays today, if the product is priced at all.
    #[must_use]
    pub fn effective_price(&self) -> Option<Money> {
        self.discounted_price.or(self.price)
    }

    #[must_use]
    pub fn has_discount(&self) -> bool {
        self.discount_percent.is_some_and(|d| d > Decimal::ZERO)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProductSearch<'a> {
    pub search: &'a str,
}

/// Fields a product manager supplies for a new product.
#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
    pub title: String,
    pub author: String,
    pub genre: GenreId,
    pub isbn: String,
    pub description: String,
    pub publisher: String,
    pub publication_date: NaiveDate,
    pub pages: u32,
    pub language: String,
    pub stock: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct StockChange {
    pub change: i64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StockLevel {
    pub stock: i64,
}

/// Discount applied to a set of products for a time window.
#[derive(Debug, Clone, Serialize)]
pub struct DiscountRequest {
    pub product_ids: Vec<ProductId>,
    /// Fraction in the open interval (0, 1).
    pub discount_rate: Decimal,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct PriceChange {
    pub price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct NewGenre<'a> {
    pub name: &'a str,
}

// =============================================================================
// Reviews
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    #[serde(default)]
    pub product: Option<ProductId>,
    pub stars: u8,
    #[serde(default)]
    pub review_text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
    pub product: ProductId,
    pub stars: u8,
    pub review_text: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReviewQuery {
    pub product: ProductId,
}

/// Moderation outcome for a pending review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    #[must_use]
    pub const fn as_path(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

// =============================================================================
// Orders & refunds
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub refund_status: Option<RefundStatus>,
    #[serde(default)]
    pub refund_updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    #[serde(default)]
    pub product: Option<ProductId>,
    pub product_title: String,
    pub quantity: u32,
    #[serde(default)]
    pub price_at_purchase: Option<Money>,
}

/// An order line with the quantity still eligible for refund.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundableItem {
    pub id: OrderItemId,
    pub product_title: String,
    pub quantity: u32,
    #[serde(default)]
    pub refundable_quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacedOrder {
    #[serde(default)]
    pub message: Option<String>,
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct StatusChange {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RefundLine {
    pub order_item_id: OrderItemId,
    pub quantity: u32,
}

/// A refund request awaiting (or past) a sales manager's decision.
#[derive(Debug, Clone, Deserialize)]
pub struct RefundRequest {
    pub id: RefundRequestId,
    #[serde(default)]
    pub user: Option<String>,
    pub quantity: u32,
    pub status: RefundStatus,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub response_message: String,
    #[serde(default)]
    pub order_item_details: Option<RefundItemDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundItemDetails {
    pub product_title: String,
    #[serde(default)]
    pub price_at_purchase: Option<Money>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefundProcessing<'a> {
    pub status: RefundDecision,
    pub response_message: &'a str,
}

/// A completed refund on the shopper's own orders.
#[derive(Debug, Clone, Deserialize)]
pub struct Refund {
    pub id: RefundRequestId,
    pub product_title: String,
    pub quantity: u32,
    pub refund_amount: Money,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevenueReport {
    pub revenue: Money,
    #[serde(default)]
    pub chart: Vec<RevenuePoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevenuePoint {
    pub period: String,
    pub revenue: Money,
}

// =============================================================================
// Payment & invoices
// =============================================================================

/// Card details submitted for an order.
#[derive(Clone, Serialize)]
pub struct PaymentDetails {
    pub card_number: String,
    /// `MM/YY`
    pub expiry: String,
    pub cvv: String,
}

impl std::fmt::Debug for PaymentDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentDetails")
            .field("card_number", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentReceipt {
    pub message: String,
    #[serde(default)]
    pub invoice_html: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub order_id: OrderId,
    pub status: String,
    /// Server-formatted `YYYY-MM-DD HH:MM:SS`.
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub customer: String,
    pub total: Money,
    pub date: NaiveDate,
}

// =============================================================================
// Profile
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub postal_code: String,
}

/// Profile edit payload. The password is only sent when one was entered.
#[derive(Clone, Default, Serialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub phone_number: String,
    pub address_line1: String,
    pub address_line2: String,
    pub city: String,
    pub postal_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl std::fmt::Debug for ProfileUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileUpdate")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("city", &self.city)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_item_count_sums_quantities() {
        let cart: Cart = serde_json::from_value(serde_json::json!({
            "id": 1,
            "items": [
                {"id": 10, "product": 42, "product_title": "Dune", "product_price": "9.99",
                 "quantity": 2, "total_price": "19.98"},
                {"id": 11, "product": 7, "product_title": "Emma", "product_price": "5.00",
                 "quantity": 3, "total_price": "15.00"}
            ],
            "total": 34.98
        }))
        .unwrap();

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.total, Money::from_cents(3498));
    }

    #[test]
    fn test_cart_item_count_saturates() {
        let cart: Cart = serde_json::from_value(serde_json::json!({
            "id": 1,
            "items": [
                {"id": 10, "product": 42, "product_title": "Dune", "product_price": "9.99",
                 "quantity": u32::MAX, "total_price": "0"},
                {"id": 11, "product": 7, "product_title": "Emma", "product_price": "5.00",
                 "quantity": 3, "total_price": "15.00"}
            ]
        }))
        .unwrap();

        assert_eq!(cart.item_count(), u32::MAX);
    }

    #[test]
    fn test_cart_upsert_serializes_override_key() {
        let body = CartUpsert {
            product_id: ProductId::new(42),
            quantity: 0,
            replace: true,
        };
        let json = serde_json::to_value(body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"product_id": 42, "quantity": 0, "override": true})
        );
    }

    #[test]
    fn test_wishlist_membership_uses_embedded_product() {
        let wishlist: Wishlist = serde_json::from_value(serde_json::json!({
            "id": 3,
            "items": [{"id": 99, "product": {"id": 42, "title": "Dune", "slug": "dune"}}]
        }))
        .unwrap();

        assert!(wishlist.contains(ProductId::new(42)));
        assert!(!wishlist.contains(ProductId::new(99)));
    }

    #[test]
    fn test_profile_update_omits_empty_password() {
        let update = ProfileUpdate {
            name: "Ada".to_string(),
            ..ProfileUpdate::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_payment_details_debug_redacts_card() {
        let details = PaymentDetails {
            card_number: "4111111111111111".to_string(),
            expiry: "12/30".to_string(),
            cvv: "123".to_string(),
        };
        let debug = format!("{details:?}");
        assert!(!debug.contains("4111111111111111"));
        assert!(!debug.contains("123\""));
    }
}
