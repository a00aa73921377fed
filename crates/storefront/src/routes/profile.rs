//! Profile route handlers: details, orders, refunds and transactions.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query},
    response::{IntoResponse, Response},
};
use bindery_core::{OrderId, OrderItemId, OrderStatus, RefundStatus};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tracing::instrument;

use super::{Layout, MessageQuery, Notice, redirect_with};
use crate::api::types::{Order, ProfileUpdate, RefundLine};
use crate::middleware::auth::SignedIn;

/// How long a refund decision is announced on the orders page.
const REFUND_NOTICE_WINDOW: TimeDelta = TimeDelta::minutes(5);

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

// =============================================================================
// Profile
// =============================================================================

/// Profile form data. An empty password leaves it unchanged.
#[derive(Default, Deserialize)]
pub struct ProfileForm {
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
    #[serde(default)]
    pub password: String,
}

impl From<ProfileForm> for ProfileUpdate {
    fn from(form: ProfileForm) -> Self {
        Self {
            name: form.name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone_number: form.phone_number.trim().to_string(),
            address_line1: form.address_line1.trim().to_string(),
            address_line2: form.address_line2.trim().to_string(),
            city: form.city.trim().to_string(),
            postal_code: form.postal_code.trim().to_string(),
            password: Some(form.password).filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "profile/edit.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub username: String,
    pub form: ProfileForm,
}

/// Display the profile form.
#[instrument(skip(shopper))]
pub async fn show(
    SignedIn(shopper): SignedIn,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&shopper, notices);

    let (username, form) = match shopper.ctx.api().get_profile().await {
        Ok(profile) => (
            profile.username,
            ProfileForm {
                name: profile.name,
                email: profile.email,
                phone_number: profile.phone_number,
                address_line1: profile.address_line1,
                address_line2: profile.address_line2,
                city: profile.city,
                postal_code: profile.postal_code,
                password: String::new(),
            },
        ),
        Err(e) => {
            layout = layout.with_error(e.user_message());
            (String::new(), ProfileForm::default())
        }
    };

    ProfileTemplate {
        layout,
        username,
        form,
    }
}

/// Save the profile.
#[instrument(skip(shopper, form))]
pub async fn update(SignedIn(shopper): SignedIn, Form(form): Form<ProfileForm>) -> Response {
    match shopper.ctx.api().update_profile(&form.into()).await {
        Ok(_) => redirect_with("/profile", Notice::Success, "Profile saved.").into_response(),
        Err(e) => redirect_with("/profile", Notice::Error, &e.user_message()).into_response(),
    }
}

// =============================================================================
// Orders
// =============================================================================

pub struct OrderView {
    pub id: OrderId,
    pub date: String,
    pub total: String,
    pub status: String,
    pub lines: Vec<String>,
    pub can_cancel: bool,
    pub can_refund: bool,
    pub refund_status: Option<String>,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            date: order.created_at.format(DATE_FORMAT).to_string(),
            total: order.total.to_string(),
            status: order.status.customer_label().to_string(),
            lines: order
                .items
                .iter()
                .map(|item| format!("{} x {}", item.product_title, item.quantity))
                .collect(),
            can_cancel: order.status == OrderStatus::Processing,
            can_refund: order.status == OrderStatus::Delivered,
            refund_status: order.refund_status.map(|s| s.as_str().to_string()),
        }
    }
}

/// Orders sharing a status.
pub struct OrderGroup {
    pub label: String,
    pub orders: Vec<OrderView>,
}

/// Group orders by status, in status order, dropping empty groups.
fn group_by_status(orders: &[Order]) -> Vec<OrderGroup> {
    OrderStatus::ALL
        .iter()
        .map(|status| OrderGroup {
            label: status.customer_label().to_string(),
            orders: orders
                .iter()
                .filter(|order| order.status == *status)
                .map(OrderView::from)
                .collect(),
        })
        .filter(|group| !group.orders.is_empty())
        .collect()
}

/// Notices for refund decisions made within the last few minutes.
fn recent_refund_notices(orders: &[Order], now: DateTime<Utc>) -> Vec<String> {
    orders
        .iter()
        .filter_map(|order| {
            let status = order.refund_status?;
            let updated = order.refund_updated_at?;
            if status == RefundStatus::Pending || now - updated > REFUND_NOTICE_WINDOW {
                return None;
            }
            Some(format!(
                "Your refund request for order #{} was {}.",
                order.id,
                status.as_str().to_lowercase()
            ))
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "profile/orders.html")]
pub struct OrdersTemplate {
    pub layout: Layout,
    pub groups: Vec<OrderGroup>,
}

/// Order history.
#[instrument(skip(shopper))]
pub async fn orders(
    SignedIn(shopper): SignedIn,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&shopper, notices);

    let groups = match shopper.ctx.api().my_orders().await {
        Ok(orders) => {
            let notices = recent_refund_notices(&orders, Utc::now());
            if !notices.is_empty() && layout.info.is_none() {
                layout = layout.with_info(notices.join(" "));
            }
            group_by_status(&orders)
        }
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    OrdersTemplate { layout, groups }
}

/// Cancel an order that has not shipped.
#[instrument(skip(shopper))]
pub async fn cancel_order(SignedIn(shopper): SignedIn, Path(id): Path<OrderId>) -> Response {
    match shopper
        .ctx
        .api()
        .update_order_status(id, OrderStatus::Cancelled)
        .await
    {
        Ok(()) => redirect_with(
            "/profile/orders",
            Notice::Success,
            &format!("Order #{id} cancelled."),
        )
        .into_response(),
        Err(e) => redirect_with("/profile/orders", Notice::Error, &e.user_message()).into_response(),
    }
}

// =============================================================================
// Refunds
// =============================================================================

pub struct RefundItemView {
    pub id: OrderItemId,
    pub title: String,
    pub refundable: u32,
}

#[derive(Template, WebTemplate)]
#[template(path = "profile/refund.html")]
pub struct RefundFormTemplate {
    pub layout: Layout,
    pub order_id: OrderId,
    pub items: Vec<RefundItemView>,
}

/// Pick quantities to refund from a delivered order.
#[instrument(skip(shopper))]
pub async fn refund_form(
    SignedIn(shopper): SignedIn,
    Path(id): Path<OrderId>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&shopper, notices);

    let items = match shopper.ctx.api().order_items(id).await {
        Ok(items) => items
            .into_iter()
            .filter(|item| item.refundable_quantity > 0)
            .map(|item| RefundItemView {
                id: item.id,
                title: item.product_title,
                refundable: item.refundable_quantity,
            })
            .collect(),
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    RefundFormTemplate {
        layout,
        order_id: id,
        items,
    }
}

/// Prefix of the per-item quantity fields on the refund form.
const QUANTITY_FIELD_PREFIX: &str = "qty_";

/// Selected refund lines, ordered by item id. Unparseable and zero
/// quantities are skipped.
fn selected_lines(fields: &[(String, String)]) -> Vec<RefundLine> {
    let mut lines: Vec<RefundLine> = fields
        .iter()
        .filter_map(|(key, value)| {
            let id = key.strip_prefix(QUANTITY_FIELD_PREFIX)?.parse().ok()?;
            let quantity = value.trim().parse::<u32>().ok().filter(|q| *q > 0)?;
            Some(RefundLine {
                order_item_id: id,
                quantity,
            })
        })
        .collect();
    lines.sort_by_key(|line| line.order_item_id);
    lines
}

/// Submit one refund request per selected item. The first failure stops
/// the rest.
#[instrument(skip(shopper, fields))]
pub async fn request_refund(
    SignedIn(shopper): SignedIn,
    Path(id): Path<OrderId>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let back = format!("/profile/orders/{id}/refund");
    let lines = selected_lines(&fields);

    if lines.is_empty() {
        return redirect_with(
            &back,
            Notice::Error,
            "Select at least one item to refund.",
        )
        .into_response();
    }

    let api = shopper.ctx.api();
    for line in &lines {
        if let Err(e) = api.request_refund(id, *line).await {
            return redirect_with(&back, Notice::Error, &e.user_message()).into_response();
        }
    }

    redirect_with(
        "/profile/orders",
        Notice::Success,
        "Refund request submitted.",
    )
    .into_response()
}

pub struct RefundView {
    pub title: String,
    pub quantity: u32,
    pub amount: String,
    pub date: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "profile/refunds.html")]
pub struct RefundsTemplate {
    pub layout: Layout,
    pub refunds: Vec<RefundView>,
}

/// Completed refunds.
#[instrument(skip(shopper))]
pub async fn refunds(
    SignedIn(shopper): SignedIn,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&shopper, notices);

    let refunds = match shopper.ctx.api().my_refunds().await {
        Ok(refunds) => refunds
            .into_iter()
            .map(|refund| RefundView {
                title: refund.product_title,
                quantity: refund.quantity,
                amount: refund.refund_amount.to_string(),
                date: refund
                    .created_at
                    .map(|at| at.format(DATE_FORMAT).to_string())
                    .unwrap_or_default(),
            })
            .collect(),
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    RefundsTemplate { layout, refunds }
}

// =============================================================================
// Transactions
// =============================================================================

pub struct TransactionView {
    pub id: String,
    pub order_id: OrderId,
    pub status: String,
    pub date: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "profile/transactions.html")]
pub struct TransactionsTemplate {
    pub layout: Layout,
    pub transactions: Vec<TransactionView>,
}

/// Payment history.
#[instrument(skip(shopper))]
pub async fn transactions(
    SignedIn(shopper): SignedIn,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&shopper, notices);

    let transactions = match shopper.ctx.api().transactions().await {
        Ok(transactions) => transactions
            .into_iter()
            .map(|tx| TransactionView {
                id: tx.id.to_string(),
                order_id: tx.order_id,
                status: tx.status,
                date: tx.created_at,
            })
            .collect(),
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    TransactionsTemplate {
        layout,
        transactions,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn order(id: i64, status: &str, refund: Option<(&str, DateTime<Utc>)>) -> Order {
        let mut value = serde_json::json!({
            "id": id,
            "items": [{"id": id * 10, "product_title": "Dune", "quantity": 1}],
            "total": "9.99",
            "status": status,
            "created_at": "2026-01-02T03:04:05Z",
        });
        if let Some((refund_status, at)) = refund {
            value["refund_status"] = serde_json::json!(refund_status);
            value["refund_updated_at"] = serde_json::json!(at.to_rfc3339());
        }
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_group_by_status_keeps_status_order() {
        let orders = vec![
            order(1, "Delivered", None),
            order(2, "Processing", None),
            order(3, "Delivered", None),
        ];
        let groups = group_by_status(&orders);

        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, ["Processing", "Delivered"]);
        assert_eq!(groups[1].orders.len(), 2);
        assert!(groups[0].orders[0].can_cancel);
        assert!(groups[1].orders[0].can_refund);
    }

    #[test]
    fn test_recent_refund_notice_window() {
        let now = Utc::now();
        let orders = vec![
            order(1, "Delivered", Some(("Approved", now - TimeDelta::minutes(2)))),
            order(2, "Delivered", Some(("Rejected", now - TimeDelta::minutes(30)))),
            order(3, "Delivered", Some(("Pending", now))),
        ];

        let notices = recent_refund_notices(&orders, now);
        assert_eq!(
            notices,
            ["Your refund request for order #1 was approved."]
        );
    }

    #[test]
    fn test_selected_lines_skips_zero_and_sorts() {
        let fields = vec![
            ("qty_12".to_string(), "1".to_string()),
            ("qty_3".to_string(), "0".to_string()),
            ("qty_7".to_string(), "2".to_string()),
            ("other".to_string(), "5".to_string()),
            ("qty_9".to_string(), "".to_string()),
        ];
        let lines = selected_lines(&fields);

        let ids: Vec<i64> = lines.iter().map(|l| l.order_item_id.as_i64()).collect();
        assert_eq!(ids, [7, 12]);
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn test_blank_password_not_sent() {
        let update = ProfileUpdate::from(ProfileForm {
            name: " Ada ".to_string(),
            ..ProfileForm::default()
        });
        assert_eq!(update.name, "Ada");
        assert!(update.password.is_none());
    }
}
