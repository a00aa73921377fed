//! Integration tests for the Bindery storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bindery-integration-tests
//! ```
//!
//! Nothing external is needed: [`FakeBackend`] is an in-process stand-in for
//! the bookstore REST API that records every request it receives, and
//! [`TestContext`] serves the real storefront router against it. Both listen
//! on ephemeral loopback ports.
//!
//! # Test Categories
//!
//! - `cart` - Cart add/update/remove and the item count
//! - `wishlist` - Wishlist gating on authentication
//! - `guard` - Role-gated back-office screens
//! - `checkout` - The address, order, payment sequence and its failures
//! - `api_client` - Bearer and CSRF headers on outgoing calls
//! - `storefront` - End-to-end shopping journey
//! - `refunds` - Customer refund requests and order cancellation
//! - `back_office` - Product manager and sales manager screens

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use bindery_storefront::config::StorefrontConfig;
use bindery_storefront::state::AppState;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

/// Password of every seeded user.
pub const PASSWORD: &str = "correct-horse";

/// Value of the fake API's CSRF cookie.
pub const CSRF_TOKEN: &str = "test-csrf-token";

/// Timestamp given to every fake order, refund request and review.
const ORDER_CREATED_AT: &str = "2026-01-05T10:00:00Z";

/// Body of every fake invoice PDF.
pub const INVOICE_PDF: &[u8] = b"%PDF-1.4 fake invoice";

/// Total of the fake revenue report.
pub const REPORTED_REVENUE: &str = "24.49";

// =============================================================================
// Fake bookstore API
// =============================================================================

/// A request as the fake API received it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    /// Parsed JSON body, `Value::Null` when empty or not JSON.
    pub body: Value,
    pub authorization: Option<String>,
    pub csrf: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FakeProduct {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub author: String,
    pub price_cents: i64,
    pub stock: i64,
}

impl FakeProduct {
    fn json(&self) -> Value {
        json!({
            "id": self.id,
            "slug": self.slug,
            "title": self.title,
            "author": self.author,
            "description": format!("{} by {}.", self.title, self.author),
            "price": money(self.price_cents),
            "stock": self.stock,
        })
    }
}

struct FakeUser {
    password: String,
    roles: Vec<String>,
}

struct BackendState {
    requests: Vec<RecordedRequest>,
    users: HashMap<String, FakeUser>,
    products: Vec<FakeProduct>,
    /// `(product id, quantity)` in insertion order.
    cart: Vec<(i64, i64)>,
    wishlist: Vec<i64>,
    profile: Value,
    orders: Vec<Value>,
    /// `(id, name)`
    genres: Vec<(i64, String)>,
    reviews: Vec<Value>,
    /// Created products a sales manager has not priced yet.
    unpriced: Vec<Value>,
    discounts: Vec<Value>,
    refund_requests: Vec<Value>,
    refunds: Vec<Value>,
    invoices: Vec<Value>,
    decline_payments: bool,
    failures: HashMap<String, (StatusCode, String)>,
}

impl BackendState {
    fn seeded() -> Self {
        let users = [
            ("reader", vec!["customer"]),
            ("pm", vec!["customer", "product manager"]),
            ("sales", vec!["sales manager"]),
            ("root", vec!["admin"]),
        ]
        .into_iter()
        .map(|(name, roles)| {
            (
                name.to_string(),
                FakeUser {
                    password: PASSWORD.to_string(),
                    roles: roles.into_iter().map(String::from).collect(),
                },
            )
        })
        .collect();

        let product = |id, slug: &str, title: &str, author: &str, price_cents, stock| FakeProduct {
            id,
            slug: slug.to_string(),
            title: title.to_string(),
            author: author.to_string(),
            price_cents,
            stock,
        };

        Self {
            requests: Vec::new(),
            users,
            products: vec![
                product(1, "dune", "Dune", "Frank Herbert", 999, 5),
                product(2, "emma", "Emma", "Jane Austen", 500, 0),
                product(3, "ulysses", "Ulysses", "James Joyce", 1450, 2),
            ],
            cart: Vec::new(),
            wishlist: Vec::new(),
            profile: json!({}),
            orders: Vec::new(),
            genres: vec![(1, "Science Fiction".to_string()), (2, "Classics".to_string())],
            reviews: vec![json!({
                "id": 1,
                "product": 1,
                "stars": 4,
                "review_text": "The spice must flow.",
                "username": "reader",
                "status": "pending",
                "created_at": ORDER_CREATED_AT,
            })],
            unpriced: Vec::new(),
            discounts: Vec::new(),
            refund_requests: Vec::new(),
            refunds: Vec::new(),
            invoices: vec![
                json!({"id": 1, "customer": "reader", "total": "9.99", "date": "2026-01-05"}),
                json!({"id": 2, "customer": "pm", "total": "14.50", "date": "2026-02-10"}),
            ],
            decline_payments: false,
            failures: HashMap::new(),
        }
    }

    fn product(&self, id: i64) -> Option<&FakeProduct> {
        self.products.iter().find(|p| p.id == id)
    }

    fn respond(&mut self, req: &RecordedRequest) -> Response {
        if let Some((status, message)) = self.failures.get(&req.path) {
            return error(*status, message);
        }

        let user = req
            .authorization
            .as_deref()
            .and_then(|auth| auth.strip_prefix("Bearer token-"))
            .filter(|name| self.users.contains_key(*name))
            .map(str::to_owned);
        let segments: Vec<&str> = req.path.trim_matches('/').split('/').collect();

        match (req.method.as_str(), segments.as_slice()) {
            ("GET", ["api", "csrf"]) => (
                [(header::SET_COOKIE, format!("csrftoken={CSRF_TOKEN}; Path=/"))],
                Json(json!({"detail": "CSRF cookie set"})),
            )
                .into_response(),
            ("POST", ["api", "auth", "login"]) => self.login(&req.body),
            ("POST", ["api", "auth", "register"]) => self.register(&req.body),
            ("POST", ["api", "auth", "logout"]) => Json(json!({"detail": "Logged out"})).into_response(),

            ("GET", ["cart"]) => Json(self.cart_json()).into_response(),
            ("POST", ["cart"]) => self.upsert_cart(&req.body),

            ("GET", ["api", "products"]) => {
                let search = req
                    .query
                    .as_deref()
                    .and_then(|q| q.strip_prefix("search="))
                    .map(str::to_lowercase);
                let products: Vec<Value> = self
                    .products
                    .iter()
                    .filter(|p| {
                        search
                            .as_deref()
                            .is_none_or(|term| p.title.to_lowercase().contains(term))
                    })
                    .map(FakeProduct::json)
                    .collect();
                Json(products).into_response()
            }
            ("GET", ["api", "products", slug]) if *slug != "pending" => self
                .products
                .iter()
                .find(|p| p.slug == *slug)
                .map_or_else(not_found, |p| Json(p.json()).into_response()),
            ("GET", ["api", "reviews"]) => Json(json!([])).into_response(),

            (_, _) if user.is_none() => error(
                StatusCode::UNAUTHORIZED,
                "Authentication credentials were not provided.",
            ),
            (_, _) => self.respond_authenticated(req, &segments, user.unwrap_or_default()),
        }
    }

    fn respond_authenticated(&mut self, req: &RecordedRequest, segments: &[&str], user: String) -> Response {
        match (req.method.as_str(), segments) {
            ("GET", ["api", "user-info"]) => {
                let roles = self.users.get(&user).map(|u| u.roles.clone()).unwrap_or_default();
                Json(json!({"username": user, "roles": roles})).into_response()
            }

            ("GET", ["api", "wishlist"]) => Json(self.wishlist_json()).into_response(),
            ("POST", ["api", "wishlist", "add"]) => {
                let id = req.body["product_id"].as_i64().unwrap_or_default();
                if !self.wishlist.contains(&id) {
                    self.wishlist.push(id);
                }
                Json(self.wishlist_json()).into_response()
            }
            ("POST", ["api", "wishlist", "remove"]) => {
                let id = req.body["product_id"].as_i64().unwrap_or_default();
                self.wishlist.retain(|p| *p != id);
                Json(self.wishlist_json()).into_response()
            }

            ("POST", ["api", "products", slug, "adjust_stock"]) => {
                let change = req.body["change"].as_i64().unwrap_or_default();
                match self.products.iter_mut().find(|p| p.slug == *slug) {
                    Some(product) => {
                        product.stock += change;
                        Json(json!({"stock": product.stock})).into_response()
                    }
                    None => not_found(),
                }
            }

            ("GET", ["profile"]) => {
                let mut profile = self.profile.clone();
                profile["username"] = json!(user);
                Json(profile).into_response()
            }
            ("POST", ["profile", "edit"]) => {
                if let (Some(profile), Some(update)) = (self.profile.as_object_mut(), req.body.as_object()) {
                    for (key, value) in update {
                        if key != "password" {
                            profile.insert(key.clone(), value.clone());
                        }
                    }
                }
                Json(self.profile.clone()).into_response()
            }

            ("POST", ["api", "orders", "place"]) => self.place_order(&user),
            ("GET", ["api", "orders", "mine"]) => {
                let mine: Vec<Value> = self
                    .orders
                    .iter()
                    .filter(|o| o["customer"] == user.as_str())
                    .cloned()
                    .collect();
                Json(mine).into_response()
            }
            ("GET", ["api", "orders"]) => Json(self.orders.clone()).into_response(),
            ("PATCH", ["api", "orders", order, "status"]) => {
                let status = req.body["status"].clone();
                match self.orders.iter_mut().find(|o| o["id"].to_string() == *order) {
                    Some(found) => {
                        found["status"] = status;
                        Json(found.clone()).into_response()
                    }
                    None => not_found(),
                }
            }
            ("POST", ["api", "payment", "process", order]) => self.pay(order),
            ("GET", ["api", "payment", "transactions"]) => Json(json!([])).into_response(),

            _ => self.respond_back_office(req, segments, &user),
        }
    }

    /// Refunds, catalog management, moderation, reports and invoices.
    fn respond_back_office(&mut self, req: &RecordedRequest, segments: &[&str], user: &str) -> Response {
        match (req.method.as_str(), segments) {
            ("GET", ["api", "orders", order, "items"]) => self.order_items(order),
            ("POST", ["api", "orders", order, "refund-requests"]) => self.request_refund(order, &req.body, user),
            ("GET", ["api", "orders", "refund-requests", "pending"]) => {
                let pending: Vec<Value> = self
                    .refund_requests
                    .iter()
                    .filter(|r| r["status"] == "Pending")
                    .cloned()
                    .collect();
                Json(pending).into_response()
            }
            ("POST", ["api", "orders", "refund-requests", id, "process"]) => self.process_refund(id, &req.body),
            ("GET", ["api", "orders", "refunds", "mine"]) => {
                let mine: Vec<Value> = self
                    .refunds
                    .iter()
                    .filter(|r| r["user"] == user)
                    .cloned()
                    .collect();
                Json(mine).into_response()
            }
            ("GET", ["api", "orders", "revenue-report"]) => Json(json!({
                "revenue": REPORTED_REVENUE,
                "chart": [{"period": "2026-01", "revenue": REPORTED_REVENUE}],
            }))
            .into_response(),

            ("POST", ["api", "products"]) => self.create_product(&req.body),
            ("GET", ["api", "products", "pending"]) => Json(self.unpriced.clone()).into_response(),
            ("POST", ["api", "products", "apply_discount"]) => {
                self.discounts.push(req.body.clone());
                Json(json!({"message": "Discount applied."})).into_response()
            }
            ("POST", ["api", "products", slug, "set_price"]) => self.set_price(slug, &req.body),
            ("DELETE", ["api", "products", slug]) => {
                let before = self.products.len();
                self.products.retain(|p| p.slug != *slug);
                if self.products.len() == before {
                    not_found()
                } else {
                    StatusCode::NO_CONTENT.into_response()
                }
            }

            ("GET", ["api", "genres"]) => {
                let genres: Vec<Value> = self
                    .genres
                    .iter()
                    .map(|(id, name)| json!({"id": id, "name": name}))
                    .collect();
                Json(genres).into_response()
            }
            ("POST", ["api", "genres"]) => {
                let name = req.body["name"].as_str().unwrap_or_default().to_string();
                if self.genres.iter().any(|(_, existing)| *existing == name) {
                    return error(StatusCode::BAD_REQUEST, "A genre with this name already exists.");
                }
                let id = self.genres.iter().map(|(id, _)| *id).max().unwrap_or_default() + 1;
                self.genres.push((id, name.clone()));
                (StatusCode::CREATED, Json(json!({"id": id, "name": name}))).into_response()
            }
            ("DELETE", ["api", "genres", id]) => {
                self.genres.retain(|(existing, _)| existing.to_string() != *id);
                StatusCode::NO_CONTENT.into_response()
            }

            ("GET", ["api", "reviews", "pending"]) => {
                let pending: Vec<Value> = self
                    .reviews
                    .iter()
                    .filter(|r| r["status"] == "pending")
                    .cloned()
                    .collect();
                Json(pending).into_response()
            }
            ("POST", ["api", "reviews", id, action @ ("approve" | "reject")]) => {
                let status = if *action == "approve" { "approved" } else { "rejected" };
                match self.reviews.iter_mut().find(|r| r["id"].to_string() == *id) {
                    Some(review) => {
                        review["status"] = json!(status);
                        Json(json!({"message": format!("Review {status}.")})).into_response()
                    }
                    None => not_found(),
                }
            }

            ("GET", ["api", "invoices"]) => {
                let params = query_params(req.query.as_deref());
                let in_range = |date: &str| {
                    params.get("start").is_none_or(|start| date >= start.as_str())
                        && params.get("end").is_none_or(|end| date <= end.as_str())
                };
                let invoices: Vec<Value> = self
                    .invoices
                    .iter()
                    .filter(|i| in_range(i["date"].as_str().unwrap_or_default()))
                    .cloned()
                    .collect();
                Json(invoices).into_response()
            }
            ("GET", ["api", "invoices", id, "html"]) => (
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                format!("<html><body><h1>Invoice #{id}</h1></body></html>"),
            )
                .into_response(),
            ("GET", ["api", "invoices", _, "pdf"]) => {
                ([(header::CONTENT_TYPE, "application/pdf")], INVOICE_PDF).into_response()
            }

            _ => not_found(),
        }
    }

    fn login(&self, body: &Value) -> Response {
        let username = body["username"].as_str().unwrap_or_default();
        let password = body["password"].as_str().unwrap_or_default();

        match self.users.get(username) {
            Some(user) if user.password == password => Json(json!({
                "access": format!("token-{username}"),
                "refresh": format!("refresh-{username}"),
                "username": username,
                "email": format!("{username}@example.com"),
            }))
            .into_response(),
            _ => error(StatusCode::UNAUTHORIZED, "Invalid username or password."),
        }
    }

    fn register(&mut self, body: &Value) -> Response {
        let username = body["username"].as_str().unwrap_or_default().to_string();
        if self.users.contains_key(&username) {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"username": ["A user with that username already exists."]})),
            )
                .into_response();
        }

        self.users.insert(
            username.clone(),
            FakeUser {
                password: body["password"].as_str().unwrap_or_default().to_string(),
                roles: vec!["customer".to_string()],
            },
        );
        (StatusCode::CREATED, Json(json!({"username": username}))).into_response()
    }

    fn cart_json(&self) -> Value {
        let mut total = 0;
        let items: Vec<Value> = self
            .cart
            .iter()
            .zip(100..)
            .filter_map(|((id, quantity), line_id)| {
                let product = self.product(*id)?;
                total += product.price_cents * quantity;
                Some(json!({
                    "id": line_id,
                    "product": product.id,
                    "product_title": product.title,
                    "product_price": money(product.price_cents),
                    "quantity": quantity,
                    "total_price": money(product.price_cents * quantity),
                    "stock": product.stock,
                }))
            })
            .collect();

        json!({"id": 1, "items": items, "total": money(total)})
    }

    fn upsert_cart(&mut self, body: &Value) -> Response {
        let id = body["product_id"].as_i64().unwrap_or_default();
        let quantity = body["quantity"].as_i64().unwrap_or_default();
        let replace = body["override"].as_bool().unwrap_or_default();

        let Some(stock) = self.product(id).map(|p| p.stock) else {
            return error(StatusCode::NOT_FOUND, "Product not found.");
        };

        let current = self
            .cart
            .iter()
            .find(|(p, _)| *p == id)
            .map_or(0, |(_, q)| *q);
        let wanted = if replace { quantity } else { current + quantity };
        if wanted > stock {
            return error(StatusCode::BAD_REQUEST, "Not enough stock.");
        }

        self.cart.retain(|(p, _)| *p != id);
        if wanted > 0 {
            self.cart.push((id, wanted));
        }
        Json(self.cart_json()).into_response()
    }

    fn wishlist_json(&self) -> Value {
        let items: Vec<Value> = self
            .wishlist
            .iter()
            .zip(200..)
            .filter_map(|(id, line_id)| {
                let product = self.product(*id)?;
                Some(json!({
                    "id": line_id,
                    "product": {
                        "id": product.id,
                        "title": product.title,
                        "slug": product.slug,
                        "product_price": money(product.price_cents),
                    },
                }))
            })
            .collect();

        json!({"id": 1, "items": items})
    }

    fn place_order(&mut self, user: &str) -> Response {
        if self.cart.is_empty() {
            return error(StatusCode::BAD_REQUEST, "Your cart is empty.");
        }

        let id = i64::try_from(self.orders.len()).unwrap_or_default() + 1;
        let mut total = 0;
        let items: Vec<Value> = self
            .cart
            .iter()
            .zip(300..)
            .filter_map(|((product_id, quantity), line_id)| {
                let product = self.product(*product_id)?;
                total += product.price_cents * quantity;
                Some(json!({
                    "id": line_id,
                    "product": product.id,
                    "product_title": product.title,
                    "quantity": quantity,
                    "price_at_purchase": money(product.price_cents),
                }))
            })
            .collect();

        self.orders.push(json!({
            "id": id,
            "customer": user,
            "items": items,
            "total": money(total),
            "status": "Processing",
            "created_at": ORDER_CREATED_AT,
        }));
        self.cart.clear();

        Json(json!({"message": "Order placed successfully.", "order_id": id})).into_response()
    }

    fn order(&self, order: &str) -> Option<&Value> {
        self.orders.iter().find(|o| o["id"].to_string() == order)
    }

    /// Quantity of an order line already claimed by refund requests.
    fn requested_quantity(&self, item: i64) -> i64 {
        self.refund_requests
            .iter()
            .filter(|r| r["order_item_id"] == item && r["status"] != "Rejected")
            .filter_map(|r| r["quantity"].as_i64())
            .sum()
    }

    fn order_items(&self, order: &str) -> Response {
        let Some(found) = self.order(order) else {
            return not_found();
        };
        let delivered = found["status"] == "Delivered";
        let items: Vec<Value> = found["items"]
            .as_array()
            .into_iter()
            .flatten()
            .map(|item| {
                let id = item["id"].as_i64().unwrap_or_default();
                let quantity = item["quantity"].as_i64().unwrap_or_default();
                let refundable = if delivered {
                    (quantity - self.requested_quantity(id)).max(0)
                } else {
                    0
                };
                let mut item = item.clone();
                item["refundable_quantity"] = json!(refundable);
                item
            })
            .collect();
        Json(items).into_response()
    }

    fn request_refund(&mut self, order: &str, body: &Value, user: &str) -> Response {
        let item_id = body["order_item_id"].as_i64().unwrap_or_default();
        let quantity = body["quantity"].as_i64().unwrap_or_default();

        let Some(found) = self.order(order) else {
            return not_found();
        };
        if found["status"] != "Delivered" {
            return error(StatusCode::BAD_REQUEST, "Only delivered orders can be refunded.");
        }
        let Some(item) = found["items"]
            .as_array()
            .into_iter()
            .flatten()
            .find(|i| i["id"] == item_id)
            .cloned()
        else {
            return not_found();
        };

        let refundable = item["quantity"].as_i64().unwrap_or_default() - self.requested_quantity(item_id);
        if quantity < 1 || quantity > refundable {
            return error(
                StatusCode::BAD_REQUEST,
                "Requested quantity exceeds refundable quantity.",
            );
        }

        let id = i64::try_from(self.refund_requests.len()).unwrap_or_default() + 1;
        self.refund_requests.push(json!({
            "id": id,
            "user": user,
            "order_item_id": item_id,
            "quantity": quantity,
            "status": "Pending",
            "requested_at": ORDER_CREATED_AT,
            "response_message": "",
            "order_item_details": {
                "product_title": item["product_title"],
                "price_at_purchase": item["price_at_purchase"],
            },
        }));
        (StatusCode::CREATED, Json(json!({"id": id}))).into_response()
    }

    fn process_refund(&mut self, id: &str, body: &Value) -> Response {
        let Some(request) = self
            .refund_requests
            .iter_mut()
            .find(|r| r["id"].to_string() == id)
        else {
            return not_found();
        };
        if request["status"] != "Pending" {
            return error(StatusCode::BAD_REQUEST, "This request was already processed.");
        }

        request["status"] = body["status"].clone();
        request["response_message"] = body["response_message"].clone();

        if body["status"] == "Approved" {
            let details = &request["order_item_details"];
            let unit_cents = details["price_at_purchase"]
                .as_str()
                .and_then(cents)
                .unwrap_or_default();
            let quantity = request["quantity"].as_i64().unwrap_or_default();
            let refund = json!({
                "id": request["id"],
                "user": request["user"],
                "product_title": details["product_title"],
                "quantity": quantity,
                "refund_amount": money(unit_cents * quantity),
                "created_at": ORDER_CREATED_AT,
            });
            self.refunds.push(refund);
        }

        Json(json!({"message": "Refund request processed."})).into_response()
    }

    fn create_product(&mut self, body: &Value) -> Response {
        let title = body["title"].as_str().unwrap_or_default();
        if title.is_empty() {
            return error(StatusCode::BAD_REQUEST, "Title is required.");
        }
        let slug = title.to_lowercase().replace(' ', "-");
        let id = i64::try_from(self.products.len() + self.unpriced.len()).unwrap_or_default() + 1;

        let mut product = body.clone();
        product["id"] = json!(id);
        product["slug"] = json!(slug);
        product["price"] = Value::Null;
        self.unpriced.push(product.clone());

        (StatusCode::CREATED, Json(product)).into_response()
    }

    fn set_price(&mut self, slug: &str, body: &Value) -> Response {
        let Some(position) = self.unpriced.iter().position(|p| p["slug"] == slug) else {
            return not_found();
        };
        let Some(price_cents) = body["price"].as_str().and_then(cents) else {
            return error(StatusCode::BAD_REQUEST, "A valid price is required.");
        };

        let product = self.unpriced.remove(position);
        self.products.push(FakeProduct {
            id: product["id"].as_i64().unwrap_or_default(),
            slug: slug.to_string(),
            title: product["title"].as_str().unwrap_or_default().to_string(),
            author: product["author"].as_str().unwrap_or_default().to_string(),
            price_cents,
            stock: product["stock"].as_i64().unwrap_or_default(),
        });
        Json(json!({"message": "Price set."})).into_response()
    }

    fn pay(&self, order: &str) -> Response {
        if self.order(order).is_none() {
            return not_found();
        }
        if self.decline_payments {
            return error(StatusCode::BAD_REQUEST, "Card declined.");
        }

        Json(json!({
            "message": "Payment successful.",
            "invoice_html": format!("<html><body>Invoice for order #{order}</body></html>"),
        }))
        .into_response()
    }
}

fn money(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

/// Cents in a `"12.50"` style amount.
fn cents(amount: &str) -> Option<i64> {
    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, "0"));
    let fraction = format!("{fraction:0<2}");
    Some(whole.parse::<i64>().ok()? * 100 + fraction.get(..2)?.parse::<i64>().ok()?)
}

/// Decoded `key=value` pairs of a query string.
fn query_params(query: Option<&str>) -> HashMap<String, String> {
    query
        .unwrap_or_default()
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
}

type SharedBackend = Arc<Mutex<BackendState>>;

async fn handle(
    State(state): State<SharedBackend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    let request = RecordedRequest {
        method,
        path: uri.path().to_string(),
        query: uri.query().map(str::to_owned),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        authorization: header_value("authorization"),
        csrf: header_value("x-csrftoken"),
    };

    let mut backend = state.lock().expect("fake backend state poisoned");
    backend.requests.push(request.clone());
    backend.respond(&request)
}

/// In-process fake of the bookstore REST API.
#[derive(Clone)]
pub struct FakeBackend {
    addr: SocketAddr,
    state: SharedBackend,
}

impl FakeBackend {
    /// Start the fake on an ephemeral port with seeded users and products.
    pub async fn start() -> Self {
        let state = Arc::new(Mutex::new(BackendState::seeded()));
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Fake backend has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake backend failed");
        });

        Self { addr, state }
    }

    fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().expect("fake backend state poisoned")
    }

    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("Fake backend URL is valid")
    }

    pub fn add_user(&self, username: &str, roles: &[&str]) {
        self.lock().users.insert(
            username.to_string(),
            FakeUser {
                password: PASSWORD.to_string(),
                roles: roles.iter().map(|r| (*r).to_string()).collect(),
            },
        );
    }

    /// Answer every request to `path` with `status` and an error message.
    pub fn fail(&self, path: &str, status: StatusCode, message: &str) {
        self.lock()
            .failures
            .insert(path.to_string(), (status, message.to_string()));
    }

    pub fn recover(&self, path: &str) {
        self.lock().failures.remove(path);
    }

    pub fn set_decline_payments(&self, decline: bool) {
        self.lock().decline_payments = decline;
    }

    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    /// Requests whose path starts with `prefix`, in arrival order.
    #[must_use]
    pub fn requests_to(&self, prefix: &str) -> Vec<RecordedRequest> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.path.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn clear_requests(&self) {
        self.lock().requests.clear();
    }

    #[must_use]
    pub fn cart_quantity(&self, product_id: i64) -> i64 {
        self.lock()
            .cart
            .iter()
            .find(|(p, _)| *p == product_id)
            .map_or(0, |(_, q)| *q)
    }

    #[must_use]
    pub fn wishlist(&self) -> Vec<i64> {
        self.lock().wishlist.clone()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        self.lock().orders.clone()
    }

    #[must_use]
    pub fn profile(&self) -> Value {
        self.lock().profile.clone()
    }

    /// Force an order's status, as staff would on the API side.
    pub fn set_order_status(&self, order: i64, status: &str) {
        if let Some(found) = self.lock().orders.iter_mut().find(|o| o["id"] == order) {
            found["status"] = json!(status);
        }
    }

    #[must_use]
    pub fn refund_requests(&self) -> Vec<Value> {
        self.lock().refund_requests.clone()
    }

    #[must_use]
    pub fn discounts(&self) -> Vec<Value> {
        self.lock().discounts.clone()
    }

    #[must_use]
    pub fn genre_names(&self) -> Vec<String> {
        self.lock().genres.iter().map(|(_, name)| name.clone()).collect()
    }

    #[must_use]
    pub fn review_status(&self, id: i64) -> Option<String> {
        self.lock()
            .reviews
            .iter()
            .find(|r| r["id"] == id)
            .and_then(|r| r["status"].as_str().map(str::to_owned))
    }

    /// Slugs of created products still waiting for a price.
    #[must_use]
    pub fn unpriced_slugs(&self) -> Vec<String> {
        self.lock()
            .unpriced
            .iter()
            .filter_map(|p| p["slug"].as_str().map(str::to_owned))
            .collect()
    }

    #[must_use]
    pub fn stock(&self, slug: &str) -> Option<i64> {
        self.lock()
            .products
            .iter()
            .find(|p| p.slug == slug)
            .map(|p| p.stock)
    }
}

// =============================================================================
// Storefront under test
// =============================================================================

/// A running storefront, its fake API and a browser-like client.
pub struct TestContext {
    pub backend: FakeBackend,
    pub client: reqwest::Client,
    pub storefront_url: String,
}

impl TestContext {
    pub async fn new() -> Self {
        let backend = FakeBackend::start().await;
        let state = AppState::new(StorefrontConfig::for_api(backend.url()));
        let app = bindery_storefront::app(state);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind storefront");
        let addr = listener.local_addr().expect("Storefront has no address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Storefront failed");
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build test client");

        Self {
            backend,
            client,
            storefront_url: format!("http://{addr}"),
        }
    }

    /// A second browser against the same storefront and API.
    #[must_use]
    pub fn another_browser(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build test client")
    }

    /// Another shopper in their own browser, sharing this storefront and API.
    #[must_use]
    pub fn second_shopper(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            client: self.another_browser(),
            storefront_url: self.storefront_url.clone(),
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.storefront_url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn get_text(&self, path: &str) -> String {
        self.get(path).await.text().await.expect("Body was not text")
    }

    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Log in through the storefront's login form.
    pub async fn login(&self, username: &str) -> reqwest::Response {
        self.post_form(
            "/auth/login",
            &[("username", username), ("password", PASSWORD), ("next", "/")],
        )
        .await
    }

    pub async fn logout(&self) -> reqwest::Response {
        self.post_form("/auth/logout", &[]).await
    }
}

/// The `Location` header of a redirect response.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Complete checkout form data.
#[must_use]
pub fn checkout_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("name", "Ada Lovelace"),
        ("email", "ada@example.com"),
        ("phone_number", "555-0100"),
        ("address_line1", "12 Analytical Row"),
        ("address_line2", ""),
        ("city", "London"),
        ("postal_code", "N1 9GU"),
        ("card_number", "4111 1111 1111 1111"),
        ("expiry", "12/30"),
        ("cvv", "123"),
    ]
}
