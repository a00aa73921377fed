//! Payment processing and transaction history.

use bindery_core::OrderId;
use tracing::instrument;

use super::types::{PaymentDetails, PaymentReceipt, Transaction};
use super::{ApiClient, ApiResult};

impl ApiClient {
    /// Pay for a placed order. Card checks and stock updates happen server-side.
    ///
    /// # Errors
    ///
    /// Returns the server's message on a decline.
    #[instrument(skip(self, details))]
    pub async fn process_payment(
        &self,
        order: OrderId,
        details: &PaymentDetails,
    ) -> ApiResult<PaymentReceipt> {
        self.post_json(&format!("/api/payment/process/{order}/"), details)
            .await
    }

    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn transactions(&self) -> ApiResult<Vec<Transaction>> {
        self.get_json("/api/payment/transactions/").await
    }
}
