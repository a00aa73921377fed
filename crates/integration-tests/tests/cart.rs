//! Integration tests for the cart.
//!
//! Every change goes through the API's single upsert call; the storefront
//! only mirrors what the API answers.

use bindery_integration_tests::{TestContext, location};
use reqwest::StatusCode;

async fn cart_count(ctx: &TestContext) -> String {
    ctx.get_text("/cart/count").await.trim().to_string()
}

#[tokio::test]
async fn test_anonymous_add_uses_upsert() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post_form("/cart/add", &[("product_id", "1"), ("quantity", "2")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/cart?success="));

    let upserts: Vec<_> = ctx
        .backend
        .requests_to("/cart/")
        .into_iter()
        .filter(|r| r.method == "POST")
        .collect();
    assert_eq!(upserts.len(), 1);
    assert_eq!(
        upserts.first().expect("one upsert").body,
        serde_json::json!({"product_id": 1, "quantity": 2, "override": false})
    );
    assert_eq!(ctx.backend.cart_quantity(1), 2);
    assert_eq!(cart_count(&ctx).await, "2");
}

#[tokio::test]
async fn test_add_accumulates_and_update_replaces() {
    let ctx = TestContext::new().await;

    ctx.post_form("/cart/add", &[("product_id", "1")]).await;
    ctx.post_form("/cart/add", &[("product_id", "1"), ("quantity", "2")])
        .await;
    assert_eq!(ctx.backend.cart_quantity(1), 3);

    ctx.post_form("/cart/update", &[("product_id", "1"), ("quantity", "1")])
        .await;
    assert_eq!(ctx.backend.cart_quantity(1), 1);
    assert_eq!(cart_count(&ctx).await, "1");
}

#[tokio::test]
async fn test_remove_sends_zero_quantity_override() {
    let ctx = TestContext::new().await;
    ctx.post_form("/cart/add", &[("product_id", "3")]).await;

    let response = ctx.post_form("/cart/remove", &[("product_id", "3")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let last = ctx
        .backend
        .requests_to("/cart/")
        .into_iter()
        .rfind(|r| r.method == "POST")
        .expect("remove should reach the API");
    assert_eq!(
        last.body,
        serde_json::json!({"product_id": 3, "quantity": 0, "override": true})
    );
    assert_eq!(ctx.backend.cart_quantity(3), 0);
    assert_eq!(cart_count(&ctx).await, "0");
}

fn last_upsert(ctx: &TestContext) -> serde_json::Value {
    ctx.backend
        .requests_to("/cart/")
        .into_iter()
        .rfind(|r| r.method == "POST")
        .expect("an upsert should reach the API")
        .body
}

#[tokio::test]
async fn test_update_to_zero_matches_remove() {
    let ctx = TestContext::new().await;

    ctx.post_form("/cart/add", &[("product_id", "1")]).await;
    let response = ctx
        .post_form("/cart/update", &[("product_id", "1"), ("quantity", "0")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let via_update = last_upsert(&ctx);
    assert_eq!(ctx.backend.cart_quantity(1), 0);
    assert!(!ctx.get_text("/cart").await.contains("Dune"));

    ctx.post_form("/cart/add", &[("product_id", "1")]).await;
    ctx.post_form("/cart/remove", &[("product_id", "1")]).await;
    let via_remove = last_upsert(&ctx);

    assert_eq!(via_update, via_remove);
    assert_eq!(
        via_update,
        serde_json::json!({"product_id": 1, "quantity": 0, "override": true})
    );
    assert_eq!(ctx.backend.cart_quantity(1), 0);
    assert_eq!(cart_count(&ctx).await, "0");
}

#[tokio::test]
async fn test_zero_quantity_add_is_refused_locally() {
    let ctx = TestContext::new().await;
    ctx.get("/").await;
    ctx.backend.clear_requests();

    let response = ctx
        .post_form("/cart/add", &[("product_id", "1"), ("quantity", "0")])
        .await;
    assert!(location(&response).contains("error="));
    assert!(
        ctx.backend
            .requests_to("/cart/")
            .iter()
            .all(|r| r.method != "POST")
    );
}

#[tokio::test]
async fn test_server_error_keeps_last_known_cart() {
    let ctx = TestContext::new().await;
    ctx.post_form("/cart/add", &[("product_id", "1"), ("quantity", "5")])
        .await;

    // Only five in stock
    let response = ctx.post_form("/cart/add", &[("product_id", "1")]).await;
    assert!(location(&response).contains("error=Not%20enough%20stock."));
    assert_eq!(cart_count(&ctx).await, "5");
}

#[tokio::test]
async fn test_cart_page_lists_lines() {
    let ctx = TestContext::new().await;
    ctx.post_form("/cart/add", &[("product_id", "1"), ("quantity", "2")])
        .await;

    let body = ctx.get_text("/cart").await;
    assert!(body.contains("Dune"));
    assert!(body.contains("$19.98"));
}

#[tokio::test]
async fn test_carts_are_per_browser_context() {
    let ctx = TestContext::new().await;
    ctx.post_form("/cart/add", &[("product_id", "1")]).await;

    let other = ctx.another_browser();
    other
        .get(ctx.url("/"))
        .send()
        .await
        .expect("second browser request failed");

    // Each browser gets its own API client context, so its own CSRF priming
    assert_eq!(ctx.backend.requests_to("/api/csrf/").len(), 2);
}
