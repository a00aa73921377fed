//! Integration tests for role-gated back-office screens.
//!
//! Each guarded request does exactly one fresh role lookup; a missing token,
//! a missing role or a failed lookup all send the browser home with the
//! attempted path in `?from=`.

use bindery_integration_tests::{TestContext, location};
use reqwest::StatusCode;

#[tokio::test]
async fn test_signed_out_is_denied_without_lookup() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/admin").await;

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/?from=%2Fadmin");
    assert!(ctx.backend.requests_to("/api/user-info/").is_empty());
}

#[tokio::test]
async fn test_customer_is_denied_after_one_lookup() {
    let ctx = TestContext::new().await;
    ctx.login("reader").await;

    let response = ctx.get("/product-manager/products").await;

    assert_eq!(location(&response), "/?from=%2Fproduct-manager%2Fproducts");
    let lookups = ctx.backend.requests_to("/api/user-info/");
    assert_eq!(lookups.len(), 1);
    assert_eq!(
        lookups.first().and_then(|r| r.authorization.as_deref()),
        Some("Bearer token-reader")
    );
}

#[tokio::test]
async fn test_product_manager_is_allowed() {
    let ctx = TestContext::new().await;
    ctx.login("pm").await;

    let response = ctx.get("/product-manager/products").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("body");
    assert!(body.contains("Dune"));
    assert!(body.contains("/product-manager/products/dune/stock"));
}

#[tokio::test]
async fn test_roles_are_not_interchangeable() {
    let ctx = TestContext::new().await;
    ctx.login("pm").await;

    let response = ctx.get("/sales-manager/pricing").await;
    assert_eq!(location(&response), "/?from=%2Fsales-manager%2Fpricing");

    let response = ctx.get("/admin").await;
    assert_eq!(location(&response), "/?from=%2Fadmin");
}

#[tokio::test]
async fn test_role_names_match_case_insensitively() {
    let ctx = TestContext::new().await;
    ctx.backend.add_user("shouty", &["Sales Manager"]);
    ctx.login("shouty").await;

    let response = ctx.get("/sales-manager/pricing").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_lookup_failure_denies() {
    let ctx = TestContext::new().await;
    ctx.login("root").await;
    ctx.backend.fail(
        "/api/user-info/",
        StatusCode::INTERNAL_SERVER_ERROR,
        "Database unavailable",
    );

    let response = ctx.get("/admin").await;
    assert_eq!(location(&response), "/?from=%2Fadmin");

    ctx.backend.recover("/api/user-info/");
    let response = ctx.get("/admin").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_every_request_looks_roles_up_again() {
    let ctx = TestContext::new().await;
    ctx.login("root").await;

    ctx.get("/admin").await;
    ctx.get("/admin/orders").await;
    ctx.get("/admin/revenue").await;

    assert_eq!(ctx.backend.requests_to("/api/user-info/").len(), 3);
}

#[tokio::test]
async fn test_admin_dashboard_links_every_screen() {
    let ctx = TestContext::new().await;
    ctx.login("root").await;

    let body = ctx.get_text("/admin").await;
    for href in [
        "/admin/products",
        "/admin/reviews",
        "/admin/orders",
        "/admin/invoices",
        "/admin/pricing",
        "/admin/discounts",
        "/admin/refunds",
        "/admin/revenue",
    ] {
        assert!(body.contains(href), "dashboard should link {href}");
    }
}

#[tokio::test]
async fn test_denied_home_page_offers_login() {
    let ctx = TestContext::new().await;

    let body = ctx.get_text("/?from=%2Fadmin").await;
    assert!(body.contains("Please log in to view that page."));
    assert!(body.contains("/auth/login?next=%2Fadmin"));
}

#[tokio::test]
async fn test_stock_adjustment_through_guarded_screen() {
    let ctx = TestContext::new().await;
    ctx.login("pm").await;

    let response = ctx
        .post_form("/product-manager/products/ulysses/stock", &[("change", "4")])
        .await;

    assert!(location(&response).starts_with("/product-manager/products?success="));
    assert_eq!(ctx.backend.stock("ulysses"), Some(6));
}
