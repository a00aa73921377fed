//! Sales screens: discounts, pricing, refund requests, revenue.
//!
//! Rates, windows and date ranges are checked here before anything is sent;
//! everything else (what a discount does to a price, refund amounts) is the
//! API's business.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query},
    response::{IntoResponse, Response},
};
use bindery_core::{ProductId, RefundDecision, RefundRequestId};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use super::{Layout, MessageQuery, Notice, redirect_with};
use crate::api::types::{DiscountRequest, Product, RefundRequest};
use crate::middleware::guard::{RequireRole, RequiredRole};

/// `<input type="datetime-local">` format.
const DATETIME_LOCAL: &str = "%Y-%m-%dT%H:%M";

// =============================================================================
// Discounts
// =============================================================================

pub struct DiscountRow {
    pub id: ProductId,
    pub title: String,
    pub price: String,
    pub discount: String,
}

impl From<&Product> for DiscountRow {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            price: product.price.map(|p| p.to_string()).unwrap_or_default(),
            discount: product
                .discount_percent
                .filter(|_| product.has_discount())
                .map(|d| format!("{d}%"))
                .unwrap_or_default(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "sales/discounts.html")]
pub struct DiscountsTemplate {
    pub layout: Layout,
    pub base: &'static str,
    pub products: Vec<DiscountRow>,
}

/// Build a discount request from raw form pairs. Several `product_ids`
/// entries may be present, one per ticked checkbox.
///
/// # Errors
///
/// Returns a message describing the first problem found.
pub fn parse_discount(pairs: &[(String, String)]) -> Result<DiscountRequest, String> {
    let value = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .unwrap_or_default()
    };

    let product_ids = pairs
        .iter()
        .filter(|(k, _)| k == "product_ids")
        .map(|(_, v)| v.parse::<ProductId>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| "Invalid product selection.".to_string())?;
    if product_ids.is_empty() {
        return Err("Select at least one product.".to_string());
    }

    let discount_rate = value("discount_rate")
        .parse::<Decimal>()
        .ok()
        .filter(|rate| *rate > Decimal::ZERO && *rate < Decimal::ONE)
        .ok_or_else(|| "Discount rate must be between 0 and 1, e.g. 0.25.".to_string())?;

    let parse_time = |key: &str| {
        NaiveDateTime::parse_from_str(value(key), DATETIME_LOCAL)
            .map(|t| t.and_utc())
            .map_err(|_| "Enter both a start and an end time.".to_string())
    };
    let start = parse_time("start")?;
    let end = parse_time("end")?;
    if start >= end {
        return Err("The discount must end after it starts.".to_string());
    }

    Ok(DiscountRequest {
        product_ids,
        discount_rate,
        start,
        end,
    })
}

#[instrument(skip(guard))]
pub async fn discounts<R: RequiredRole>(
    guard: RequireRole<R>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&guard.shopper, notices);

    let products = match guard.shopper.ctx.api().list_products(None).await {
        Ok(products) => products.iter().map(DiscountRow::from).collect(),
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    DiscountsTemplate {
        layout,
        base: R::BASE_PATH,
        products,
    }
}

#[instrument(skip(guard))]
pub async fn apply_discount<R: RequiredRole>(
    guard: RequireRole<R>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Response {
    let back = format!("{}/discounts", R::BASE_PATH);
    let request = match parse_discount(&pairs) {
        Ok(request) => request,
        Err(message) => return redirect_with(&back, Notice::Error, &message).into_response(),
    };

    match guard.shopper.ctx.api().apply_discount(&request).await {
        Ok(()) => redirect_with(
            &back,
            Notice::Success,
            &format!("Discount applied to {} product(s).", request.product_ids.len()),
        )
        .into_response(),
        Err(e) => redirect_with(&back, Notice::Error, &e.user_message()).into_response(),
    }
}

// =============================================================================
// Pricing
// =============================================================================

pub struct UnpricedProduct {
    pub slug: String,
    pub title: String,
    pub author: String,
}

#[derive(Template, WebTemplate)]
#[template(path = "sales/pricing.html")]
pub struct PricingTemplate {
    pub layout: Layout,
    pub base: &'static str,
    pub products: Vec<UnpricedProduct>,
}

/// Products created by a product manager that still need a price.
#[instrument(skip(guard))]
pub async fn pricing<R: RequiredRole>(
    guard: RequireRole<R>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&guard.shopper, notices);

    let products = match guard.shopper.ctx.api().pending_products().await {
        Ok(products) => products
            .into_iter()
            .map(|p| UnpricedProduct {
                slug: p.slug,
                title: p.title,
                author: p.author,
            })
            .collect(),
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    PricingTemplate {
        layout,
        base: R::BASE_PATH,
        products,
    }
}

#[derive(Debug, Deserialize)]
pub struct PriceForm {
    #[serde(default)]
    pub price: String,
}

#[instrument(skip(guard))]
pub async fn set_price<R: RequiredRole>(
    guard: RequireRole<R>,
    Path(slug): Path<String>,
    Form(form): Form<PriceForm>,
) -> Response {
    let back = format!("{}/pricing", R::BASE_PATH);
    let Some(price) = form
        .price
        .trim()
        .parse::<Decimal>()
        .ok()
        .filter(|p| *p > Decimal::ZERO)
    else {
        return redirect_with(&back, Notice::Error, "Price must be a positive amount.")
            .into_response();
    };

    match guard.shopper.ctx.api().set_price(&slug, price).await {
        Ok(()) => redirect_with(&back, Notice::Success, &format!("Priced {slug} at {price}."))
            .into_response(),
        Err(e) => redirect_with(&back, Notice::Error, &e.user_message()).into_response(),
    }
}

// =============================================================================
// Refund requests
// =============================================================================

pub struct RefundRequestView {
    pub id: RefundRequestId,
    pub customer: String,
    pub product: String,
    pub unit_price: String,
    pub quantity: u32,
    pub requested: String,
}

impl From<&RefundRequest> for RefundRequestView {
    fn from(request: &RefundRequest) -> Self {
        let details = request.order_item_details.as_ref();
        Self {
            id: request.id,
            customer: request.user.clone().unwrap_or_default(),
            product: details.map(|d| d.product_title.clone()).unwrap_or_default(),
            unit_price: details
                .and_then(|d| d.price_at_purchase)
                .map(|p| p.to_string())
                .unwrap_or_default(),
            quantity: request.quantity,
            requested: request
                .requested_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "sales/refunds.html")]
pub struct RefundRequestsTemplate {
    pub layout: Layout,
    pub base: &'static str,
    pub requests: Vec<RefundRequestView>,
}

#[instrument(skip(guard))]
pub async fn refunds<R: RequiredRole>(
    guard: RequireRole<R>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&guard.shopper, notices);

    let requests = match guard.shopper.ctx.api().pending_refund_requests().await {
        Ok(requests) => requests.iter().map(RefundRequestView::from).collect(),
        Err(e) => {
            layout = layout.with_error(e.user_message());
            Vec::new()
        }
    };

    RefundRequestsTemplate {
        layout,
        base: R::BASE_PATH,
        requests,
    }
}

#[derive(Debug, Deserialize)]
pub struct RefundDecisionForm {
    pub decision: RefundDecision,
    #[serde(default)]
    pub response_message: String,
}

#[instrument(skip(guard))]
pub async fn process_refund<R: RequiredRole>(
    guard: RequireRole<R>,
    Path(id): Path<RefundRequestId>,
    Form(form): Form<RefundDecisionForm>,
) -> Response {
    let back = format!("{}/refunds", R::BASE_PATH);
    let result = guard
        .shopper
        .ctx
        .api()
        .process_refund_request(id, form.decision, form.response_message.trim())
        .await;

    match result {
        Ok(()) => {
            let message = match form.decision {
                RefundDecision::Approved => "Refund approved.",
                RefundDecision::Rejected => "Refund rejected.",
            };
            redirect_with(&back, Notice::Success, message).into_response()
        }
        Err(e) => redirect_with(&back, Notice::Error, &e.user_message()).into_response(),
    }
}

// =============================================================================
// Revenue
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl RangeQuery {
    /// Parse the range. Empty fields count as absent.
    ///
    /// # Errors
    ///
    /// Returns a message when a date is malformed or the range is backwards.
    pub fn parse(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), String> {
        let date = |raw: Option<&String>| {
            raw.map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                .transpose()
                .map_err(|_| "Dates must look like 2024-05-31.".to_string())
        };
        let start = date(self.start.as_ref())?;
        let end = date(self.end.as_ref())?;
        if let (Some(start), Some(end)) = (start, end)
            && start > end
        {
            return Err("The start date must not be after the end date.".to_string());
        }
        Ok((start, end))
    }
}

pub struct RevenueView {
    pub total: String,
    pub points: Vec<(String, String)>,
}

#[derive(Template, WebTemplate)]
#[template(path = "sales/revenue.html")]
pub struct RevenueTemplate {
    pub layout: Layout,
    pub base: &'static str,
    pub start: String,
    pub end: String,
    pub report: Option<RevenueView>,
}

/// Revenue report. Nothing is fetched until both dates are chosen.
#[instrument(skip(guard))]
pub async fn revenue<R: RequiredRole>(
    guard: RequireRole<R>,
    Query(range): Query<RangeQuery>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&guard.shopper, notices);
    let mut report = None;

    match range.parse() {
        Ok((Some(start), Some(end))) => {
            match guard.shopper.ctx.api().revenue_report(start, end).await {
                Ok(data) => {
                    report = Some(RevenueView {
                        total: data.revenue.to_string(),
                        points: data
                            .chart
                            .into_iter()
                            .map(|p| (p.period, p.revenue.to_string()))
                            .collect(),
                    });
                }
                Err(e) => layout = layout.with_error(e.user_message()),
            }
        }
        Ok(_) => {}
        Err(message) => layout = layout.with_error(message),
    }

    RevenueTemplate {
        layout,
        base: R::BASE_PATH,
        start: range.start.unwrap_or_default(),
        end: range.end.unwrap_or_default(),
        report,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_parse_discount_collects_every_product() {
        let request = parse_discount(&pairs(&[
            ("product_ids", "1"),
            ("product_ids", "4"),
            ("discount_rate", "0.25"),
            ("start", "2026-01-01T09:00"),
            ("end", "2026-01-08T09:00"),
        ]))
        .unwrap();

        assert_eq!(request.product_ids, [ProductId::new(1), ProductId::new(4)]);
        assert_eq!(request.discount_rate, Decimal::new(25, 2));
        assert!(request.start < request.end);
    }

    #[test]
    fn test_parse_discount_rate_bounds() {
        for rate in ["0", "1", "1.5", "-0.1", "abc"] {
            let result = parse_discount(&pairs(&[
                ("product_ids", "1"),
                ("discount_rate", rate),
                ("start", "2026-01-01T09:00"),
                ("end", "2026-01-08T09:00"),
            ]));
            assert!(result.is_err(), "rate {rate} should be rejected");
        }
    }

    #[test]
    fn test_parse_discount_window_must_move_forward() {
        let result = parse_discount(&pairs(&[
            ("product_ids", "1"),
            ("discount_rate", "0.1"),
            ("start", "2026-01-08T09:00"),
            ("end", "2026-01-08T09:00"),
        ]));
        assert_eq!(result.unwrap_err(), "The discount must end after it starts.");
    }

    #[test]
    fn test_parse_discount_requires_selection() {
        let result = parse_discount(&pairs(&[("discount_rate", "0.1")]));
        assert_eq!(result.unwrap_err(), "Select at least one product.");
    }

    #[test]
    fn test_range_allows_same_day() {
        let range = RangeQuery {
            start: Some("2026-03-01".to_string()),
            end: Some("2026-03-01".to_string()),
        };
        let (start, end) = range.parse().unwrap();
        assert_eq!(start, end);
    }

    #[test]
    fn test_range_rejects_backwards() {
        let range = RangeQuery {
            start: Some("2026-03-02".to_string()),
            end: Some("2026-03-01".to_string()),
        };
        assert!(range.parse().is_err());

        let empty = RangeQuery {
            start: Some(String::new()),
            end: None,
        };
        assert_eq!(empty.parse().unwrap(), (None, None));
    }
}
