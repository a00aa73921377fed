//! Invoice list, HTML view and PDF download.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query},
    http::header,
    response::{Html, IntoResponse, Response},
};
use bindery_core::InvoiceId;
use tracing::instrument;

use super::sales::RangeQuery;
use super::{Layout, MessageQuery};
use crate::api::types::Invoice;
use crate::error::Result;
use crate::middleware::guard::{RequireRole, RequiredRole};

#[derive(Template, WebTemplate)]
#[template(path = "invoices/list.html")]
pub struct InvoicesTemplate {
    pub layout: Layout,
    pub base: &'static str,
    pub start: String,
    pub end: String,
    pub invoices: Vec<Invoice>,
}

/// Invoices, optionally narrowed to a date range.
#[instrument(skip(guard))]
pub async fn index<R: RequiredRole>(
    guard: RequireRole<R>,
    Query(range): Query<RangeQuery>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    let mut layout = Layout::new(&guard.shopper, notices);

    let invoices = match range.parse() {
        Ok((start, end)) => match guard.shopper.ctx.api().list_invoices(start, end).await {
            Ok(invoices) => invoices,
            Err(e) => {
                layout = layout.with_error(e.user_message());
                Vec::new()
            }
        },
        Err(message) => {
            layout = layout.with_error(message);
            Vec::new()
        }
    };

    InvoicesTemplate {
        layout,
        base: R::BASE_PATH,
        start: range.start.unwrap_or_default(),
        end: range.end.unwrap_or_default(),
        invoices,
    }
}

/// The invoice document as the API renders it.
#[instrument(skip(guard))]
pub async fn html<R: RequiredRole>(
    guard: RequireRole<R>,
    Path(id): Path<InvoiceId>,
) -> Result<Html<String>> {
    Ok(Html(guard.shopper.ctx.api().invoice_html(id).await?))
}

#[instrument(skip(guard))]
pub async fn pdf<R: RequiredRole>(
    guard: RequireRole<R>,
    Path(id): Path<InvoiceId>,
) -> Result<Response> {
    let bytes = guard.shopper.ctx.api().invoice_pdf(id).await?;
    let disposition = format!("attachment; filename=\"invoice-{id}.pdf\"");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
