//! Invoice listing and rendering.

use bindery_core::InvoiceId;
use chrono::NaiveDate;
use reqwest::Method;
use tracing::instrument;

use super::types::{DateRange, Invoice};
use super::{ApiClient, ApiResult};

impl ApiClient {
    /// Invoices, optionally limited to a date range.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_invoices(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ApiResult<Vec<Invoice>> {
        self.get_json_with("/api/invoices/", &DateRange { start, end })
            .await
    }

    /// Invoice rendered as an HTML document.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn invoice_html(&self, id: InvoiceId) -> ApiResult<String> {
        let builder = self
            .request(Method::GET, &format!("/api/invoices/{id}/html/"))
            .await?;
        Ok(self.send(builder).await?.text().await?)
    }

    /// Invoice rendered as a PDF.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn invoice_pdf(&self, id: InvoiceId) -> ApiResult<Vec<u8>> {
        let builder = self
            .request(Method::GET, &format!("/api/invoices/{id}/pdf/"))
            .await?;
        Ok(self.send(builder).await?.bytes().await?.to_vec())
    }
}
