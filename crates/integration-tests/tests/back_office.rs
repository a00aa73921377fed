//! Integration tests for the product manager and sales manager screens.
//!
//! Form input is checked by the storefront first; anything it refuses must
//! never reach the API.

use bindery_integration_tests::{INVOICE_PDF, TestContext, location};
use reqwest::StatusCode;
use serde_json::json;

async fn signed_in(username: &str) -> TestContext {
    let ctx = TestContext::new().await;
    ctx.login(username).await;
    ctx.backend.clear_requests();
    ctx
}

/// Number of requests with `method` to exactly `path`.
fn calls(ctx: &TestContext, method: &str, path: &str) -> usize {
    ctx.backend
        .requests()
        .iter()
        .filter(|r| r.method == method && r.path == path)
        .count()
}

fn new_product_form() -> Vec<(&'static str, &'static str)> {
    vec![
        ("title", "Neuromancer"),
        ("author", "William Gibson"),
        ("genre", "1"),
        ("isbn", "9780441569595"),
        ("description", "The sky above the port."),
        ("publisher", "Ace"),
        ("publication_date", "1984-07-01"),
        ("pages", "271"),
        ("language", "English"),
        ("stock", "4"),
    ]
}

// =============================================================================
// Discounts
// =============================================================================

#[tokio::test]
async fn test_discount_is_sent_with_every_ticked_product() {
    let ctx = signed_in("sales").await;

    let response = ctx
        .post_form(
            "/sales-manager/discounts",
            &[
                ("product_ids", "1"),
                ("product_ids", "3"),
                ("discount_rate", "0.25"),
                ("start", "2026-03-01T09:00"),
                ("end", "2026-03-08T09:00"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/sales-manager/discounts?success=Discount%20applied%20to%202"));

    assert_eq!(
        ctx.backend.discounts(),
        [json!({
            "product_ids": [1, 3],
            "discount_rate": "0.25",
            "start": "2026-03-01T09:00:00Z",
            "end": "2026-03-08T09:00:00Z",
        })]
    );
}

#[tokio::test]
async fn test_invalid_discounts_never_reach_the_api() {
    let ctx = signed_in("sales").await;

    let cases: [(&[(&str, &str)], &str); 4] = [
        (
            &[
                ("discount_rate", "0.25"),
                ("start", "2026-03-01T09:00"),
                ("end", "2026-03-08T09:00"),
            ],
            "Select%20at%20least%20one%20product.",
        ),
        (
            &[
                ("product_ids", "1"),
                ("discount_rate", "1.5"),
                ("start", "2026-03-01T09:00"),
                ("end", "2026-03-08T09:00"),
            ],
            "Discount%20rate%20must%20be%20between%200%20and%201",
        ),
        (
            &[
                ("product_ids", "1"),
                ("discount_rate", "0.25"),
                ("start", ""),
                ("end", "2026-03-08T09:00"),
            ],
            "Enter%20both%20a%20start%20and%20an%20end%20time.",
        ),
        (
            &[
                ("product_ids", "1"),
                ("discount_rate", "0.25"),
                ("start", "2026-03-08T09:00"),
                ("end", "2026-03-01T09:00"),
            ],
            "The%20discount%20must%20end%20after%20it%20starts.",
        ),
    ];

    for (form, message) in cases {
        let response = ctx.post_form("/sales-manager/discounts", form).await;
        let to = location(&response);
        assert!(to.starts_with("/sales-manager/discounts?error="), "{to}");
        assert!(to.contains(message), "{to}");
    }

    assert!(ctx.backend.requests_to("/api/products/apply_discount/").is_empty());
    assert!(ctx.backend.discounts().is_empty());
}

// =============================================================================
// Products and pricing
// =============================================================================

#[tokio::test]
async fn test_created_product_waits_for_a_price() {
    let pm = signed_in("pm").await;

    let response = pm
        .post_form("/product-manager/products/new", &new_product_form())
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(
        location(&response)
            .starts_with("/product-manager/products?success=Created%20%22Neuromancer%22.")
    );

    let created = pm
        .backend
        .requests_to("/api/products/")
        .into_iter()
        .find(|r| r.method == "POST" && r.path == "/api/products/")
        .expect("create request");
    assert_eq!(created.body["genre"], 1);
    assert_eq!(created.body["publication_date"], "1984-07-01");
    assert_eq!(created.body["pages"], 271);
    assert_eq!(pm.backend.unpriced_slugs(), ["neuromancer"]);

    let sales = pm.second_shopper();
    sales.login("sales").await;
    assert!(sales.get_text("/sales-manager/pricing").await.contains("Neuromancer"));

    let response = sales
        .post_form("/sales-manager/pricing/neuromancer", &[("price", "12.50")])
        .await;
    assert_eq!(
        location(&response),
        "/sales-manager/pricing?success=Priced%20neuromancer%20at%2012.50."
    );
    let priced = pm
        .backend
        .requests_to("/api/products/neuromancer/set_price/")
        .pop()
        .expect("price request");
    assert_eq!(priced.body, json!({"price": "12.50"}));

    assert!(pm.backend.unpriced_slugs().is_empty());
    assert!(
        sales
            .get_text("/sales-manager/pricing")
            .await
            .contains("Every product has a price.")
    );
    assert!(pm.get_text("/").await.contains("Neuromancer"));
}

#[tokio::test]
async fn test_incomplete_product_is_not_sent() {
    let pm = signed_in("pm").await;

    let form: Vec<_> = new_product_form()
        .into_iter()
        .map(|(k, v)| if k == "pages" { (k, "0") } else { (k, v) })
        .collect();
    let response = pm.post_form("/product-manager/products/new", &form).await;
    assert_eq!(
        location(&response),
        "/product-manager/products/new?error=Pages%20must%20be%20a%20positive%20number."
    );
    assert_eq!(calls(&pm, "POST", "/api/products/"), 0);
}

#[tokio::test]
async fn test_non_positive_price_is_not_sent() {
    let sales = signed_in("sales").await;

    let response = sales
        .post_form("/sales-manager/pricing/dune", &[("price", "0")])
        .await;
    assert_eq!(
        location(&response),
        "/sales-manager/pricing?error=Price%20must%20be%20a%20positive%20amount."
    );
    assert!(sales.backend.requests_to("/api/products/dune/set_price/").is_empty());
}

#[tokio::test]
async fn test_delete_product() {
    let pm = signed_in("pm").await;

    let response = pm.post_form("/product-manager/products/emma/delete", &[]).await;
    assert_eq!(
        location(&response),
        "/product-manager/products?success=Product%20deleted."
    );
    assert_eq!(calls(&pm, "DELETE", "/api/products/emma/"), 1);
    assert_eq!(pm.backend.stock("emma"), None);
}

// =============================================================================
// Genres and reviews
// =============================================================================

#[tokio::test]
async fn test_genre_create_and_delete() {
    let pm = signed_in("pm").await;

    let response = pm
        .post_form("/product-manager/genres", &[("name", " Poetry ")])
        .await;
    assert_eq!(
        location(&response),
        "/product-manager/genres?success=Added%20genre%20%22Poetry%22."
    );
    assert_eq!(
        pm.backend.requests_to("/api/genres/").pop().map(|r| r.body),
        Some(json!({"name": "Poetry"}))
    );

    let response = pm.post_form("/product-manager/genres/2/delete", &[]).await;
    assert_eq!(
        location(&response),
        "/product-manager/genres?success=Genre%20deleted."
    );
    assert_eq!(calls(&pm, "DELETE", "/api/genres/2/"), 1);
    assert_eq!(pm.backend.genre_names(), ["Science Fiction", "Poetry"]);

    let page = pm.get_text("/product-manager/genres").await;
    assert!(page.contains("Poetry"));
    assert!(!page.contains("Classics"));
}

#[tokio::test]
async fn test_genre_errors() {
    let pm = signed_in("pm").await;

    let response = pm.post_form("/product-manager/genres", &[("name", "  ")]).await;
    assert_eq!(
        location(&response),
        "/product-manager/genres?error=Genre%20name%20cannot%20be%20empty."
    );
    assert_eq!(calls(&pm, "POST", "/api/genres/"), 0);

    let response = pm
        .post_form("/product-manager/genres", &[("name", "Classics")])
        .await;
    assert_eq!(
        location(&response),
        "/product-manager/genres?error=A%20genre%20with%20this%20name%20already%20exists."
    );
}

#[tokio::test]
async fn test_review_moderation() {
    let pm = signed_in("pm").await;

    let page = pm.get_text("/product-manager/reviews").await;
    assert!(page.contains("The spice must flow."));

    let response = pm.post_form("/product-manager/reviews/1/approve", &[]).await;
    assert_eq!(
        location(&response),
        "/product-manager/reviews?success=Review%20approved."
    );
    assert_eq!(calls(&pm, "POST", "/api/reviews/1/approve/"), 1);
    assert_eq!(pm.backend.review_status(1).as_deref(), Some("approved"));

    let page = pm.get_text("/product-manager/reviews").await;
    assert!(page.contains("No reviews are waiting for moderation."));
}

#[tokio::test]
async fn test_unknown_review_action_is_rejected() {
    let pm = signed_in("pm").await;

    let response = pm.post_form("/product-manager/reviews/1/publish", &[]).await;
    assert!(response.status().is_client_error());
    assert_eq!(pm.backend.review_status(1).as_deref(), Some("pending"));
}

// =============================================================================
// Revenue
// =============================================================================

#[tokio::test]
async fn test_revenue_report_with_both_dates() {
    let sales = signed_in("sales").await;

    let body = sales
        .get_text("/sales-manager/revenue?start=2026-01-01&end=2026-01-31")
        .await;
    assert!(body.contains("Total revenue: <strong>$24.49</strong>"));
    assert!(body.contains("<td>2026-01</td>"));

    let report = sales
        .backend
        .requests_to("/api/orders/revenue-report/")
        .pop()
        .expect("report request");
    assert_eq!(report.query.as_deref(), Some("start=2026-01-01&end=2026-01-31"));
}

#[tokio::test]
async fn test_revenue_report_waits_for_both_dates() {
    let sales = signed_in("sales").await;

    let body = sales.get_text("/sales-manager/revenue?start=2026-01-01").await;
    assert!(!body.contains("Total revenue"));

    let body = sales
        .get_text("/sales-manager/revenue?start=2026-02-01&end=2026-01-01")
        .await;
    assert!(body.contains("The start date must not be after the end date."));

    assert!(sales.backend.requests_to("/api/orders/revenue-report/").is_empty());
}

// =============================================================================
// Invoices
// =============================================================================

#[tokio::test]
async fn test_invoice_list_and_range() {
    let pm = signed_in("pm").await;

    let all = pm.get_text("/product-manager/invoices").await;
    assert!(all.contains("<td>#1</td>"));
    assert!(all.contains("<td>#2</td>"));

    let february = pm
        .get_text("/product-manager/invoices?start=2026-02-01&end=")
        .await;
    assert!(!february.contains("<td>#1</td>"));
    assert!(february.contains("<td>#2</td>"));
    let listed = pm
        .backend
        .requests_to("/api/invoices/")
        .pop()
        .expect("invoice request");
    assert_eq!(listed.query.as_deref(), Some("start=2026-02-01"));

    let sales = pm.second_shopper();
    sales.login("sales").await;
    assert!(sales.get_text("/sales-manager/invoices").await.contains("<td>#1</td>"));
}

#[tokio::test]
async fn test_invoice_documents() {
    let pm = signed_in("pm").await;

    let html = pm.get("/product-manager/invoices/1").await;
    assert_eq!(html.status(), StatusCode::OK);
    assert!(html.text().await.expect("body").contains("Invoice #1"));

    let pdf = pm.get("/product-manager/invoices/1/pdf").await;
    assert_eq!(pdf.status(), StatusCode::OK);
    assert_eq!(
        pdf.headers()[reqwest::header::CONTENT_TYPE],
        "application/pdf"
    );
    assert_eq!(
        pdf.headers()[reqwest::header::CONTENT_DISPOSITION],
        r#"attachment; filename="invoice-1.pdf""#
    );
    assert_eq!(pdf.bytes().await.expect("bytes").as_ref(), INVOICE_PDF);
}

#[tokio::test]
async fn test_customers_cannot_open_back_office_screens() {
    let ctx = signed_in("reader").await;

    for path in [
        "/sales-manager/discounts",
        "/sales-manager/revenue?start=2026-01-01&end=2026-01-31",
        "/product-manager/invoices",
        "/product-manager/genres",
    ] {
        let response = ctx.get(path).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
    }
    assert!(ctx.backend.requests_to("/api/orders/revenue-report/").is_empty());
    assert!(ctx.backend.requests_to("/api/invoices/").is_empty());
    assert!(ctx.backend.requests_to("/api/genres/").is_empty());
}
