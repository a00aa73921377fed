//! Admin dashboard.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::Query, response::IntoResponse};
use bindery_core::{Capability, RoleSet};
use tracing::instrument;

use super::{Layout, MessageQuery};
use crate::middleware::guard::roles::Admin;
use crate::middleware::guard::{RequireRole, RequiredRole};

/// A dashboard link.
pub struct DashboardLink {
    pub label: &'static str,
    pub href: String,
}

/// Screen for a capability, relative to the mount point.
const fn screen(capability: Capability) -> (&'static str, &'static str) {
    match capability {
        Capability::ManageCatalog => ("Products", "/products"),
        Capability::ManageStock => ("Stock", "/products"),
        Capability::ModerateReviews => ("Reviews", "/reviews"),
        Capability::ManageOrders => ("Orders", "/orders"),
        Capability::ViewInvoices => ("Invoices", "/invoices"),
        Capability::ManagePricing => ("Pricing", "/pricing"),
        Capability::ManageDiscounts => ("Discounts", "/discounts"),
        Capability::ProcessRefunds => ("Refund requests", "/refunds"),
        Capability::ViewRevenue => ("Revenue", "/revenue"),
    }
}

/// Links for every capability the roles grant, in a stable order.
#[must_use]
pub fn dashboard_links(roles: &RoleSet, base: &str) -> Vec<DashboardLink> {
    Capability::ALL
        .into_iter()
        .filter(|capability| roles.can(*capability))
        .map(|capability| {
            let (label, path) = screen(capability);
            DashboardLink {
                label,
                href: format!("{base}{path}"),
            }
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "admin/dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub links: Vec<DashboardLink>,
}

#[instrument(skip(guard))]
pub async fn dashboard(
    guard: RequireRole<Admin>,
    Query(notices): Query<MessageQuery>,
) -> impl IntoResponse {
    DashboardTemplate {
        layout: Layout::new(&guard.shopper, notices),
        links: dashboard_links(&guard.roles, Admin::BASE_PATH),
    }
}
