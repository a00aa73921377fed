//! Orders, refund requests and the revenue report.

use bindery_core::{OrderId, OrderStatus, RefundDecision, RefundRequestId};
use chrono::NaiveDate;
use reqwest::Method;
use tracing::instrument;

use super::types::{
    DateRange, Order, PlacedOrder, Refund, RefundLine, RefundProcessing, RefundRequest,
    RefundableItem, RevenueReport, StatusChange,
};
use super::{ApiClient, ApiResult};

impl ApiClient {
    /// Turn the current cart into an order awaiting payment.
    ///
    /// # Errors
    ///
    /// Returns the server's message, e.g. for an empty cart.
    #[instrument(skip(self))]
    pub async fn place_order(&self) -> ApiResult<PlacedOrder> {
        let builder = self.request(Method::POST, "/api/orders/place/").await?;
        self.execute(builder).await
    }

    /// The signed-in shopper's orders.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn my_orders(&self) -> ApiResult<Vec<Order>> {
        self.get_json("/api/orders/mine/").await
    }

    /// Every order, for staff screens.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn all_orders(&self) -> ApiResult<Vec<Order>> {
        self.get_json("/api/orders/").await
    }

    /// Request a status change. The server enforces the transition rules.
    ///
    /// # Errors
    ///
    /// Returns the server's message if the change is refused.
    #[instrument(skip(self))]
    pub async fn update_order_status(&self, order: OrderId, status: OrderStatus) -> ApiResult<()> {
        let builder = self
            .request(Method::PATCH, &format!("/api/orders/{order}/status/"))
            .await?
            .json(&StatusChange { status });
        self.send(builder).await.map(drop)
    }

    /// Lines of an order with their refundable quantities.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn order_items(&self, order: OrderId) -> ApiResult<Vec<RefundableItem>> {
        self.get_json(&format!("/api/orders/{order}/items/")).await
    }

    /// # Errors
    ///
    /// Returns the server's message if the request is refused.
    #[instrument(skip(self))]
    pub async fn request_refund(&self, order: OrderId, line: RefundLine) -> ApiResult<()> {
        self.post_discard(&format!("/api/orders/{order}/refund-requests/"), &line)
            .await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn pending_refund_requests(&self) -> ApiResult<Vec<RefundRequest>> {
        self.get_json("/api/orders/refund-requests/pending/").await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self, response_message))]
    pub async fn process_refund_request(
        &self,
        id: RefundRequestId,
        decision: RefundDecision,
        response_message: &str,
    ) -> ApiResult<()> {
        self.post_discard(
            &format!("/api/orders/refund-requests/{id}/process/"),
            &RefundProcessing {
                status: decision,
                response_message,
            },
        )
        .await
    }

    /// Refunds granted on the shopper's own orders.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn my_refunds(&self) -> ApiResult<Vec<Refund>> {
        self.get_json("/api/orders/refunds/mine/").await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn revenue_report(&self, start: NaiveDate, end: NaiveDate) -> ApiResult<RevenueReport> {
        self.get_json_with(
            "/api/orders/revenue-report/",
            &DateRange {
                start: Some(start),
                end: Some(end),
            },
        )
        .await
    }
}
