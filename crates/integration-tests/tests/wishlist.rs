//! Integration tests for wishlist gating.
//!
//! A signed-out shopper never causes a wishlist request; signing in loads
//! the wishlist and signing out clears it.

use bindery_integration_tests::{TestContext, location};

#[tokio::test]
async fn test_signed_out_toggle_makes_no_request() {
    let ctx = TestContext::new().await;

    let response = ctx
        .post_form("/wishlist/toggle", &[("product_id", "1"), ("next", "/")])
        .await;

    assert_eq!(
        location(&response),
        "/?info=Please%20log%20in%20to%20use%20your%20wishlist."
    );
    assert!(ctx.backend.requests_to("/api/wishlist/").is_empty());
}

#[tokio::test]
async fn test_signed_out_wishlist_page_shows_notice() {
    let ctx = TestContext::new().await;

    let body = ctx.get_text("/wishlist").await;
    assert!(body.contains("Please log in to use your wishlist."));
    assert!(ctx.backend.requests_to("/api/wishlist/").is_empty());
}

#[tokio::test]
async fn test_toggle_adds_then_removes() {
    let ctx = TestContext::new().await;
    ctx.login("reader").await;

    ctx.post_form("/wishlist/toggle", &[("product_id", "3")]).await;
    assert_eq!(ctx.backend.wishlist(), [3]);
    assert!(ctx.get_text("/wishlist").await.contains("Ulysses"));

    ctx.post_form("/wishlist/toggle", &[("product_id", "3")]).await;
    assert!(ctx.backend.wishlist().is_empty());

    let paths: Vec<String> = ctx
        .backend
        .requests_to("/api/wishlist/")
        .into_iter()
        .filter(|r| r.method == "POST")
        .map(|r| r.path)
        .collect();
    assert_eq!(paths, ["/api/wishlist/add/", "/api/wishlist/remove/"]);
}

#[tokio::test]
async fn test_login_fetches_wishlist_and_logout_clears_it() {
    let ctx = TestContext::new().await;
    ctx.get("/").await;
    assert!(ctx.backend.requests_to("/api/wishlist/").is_empty());

    ctx.login("reader").await;
    assert!(
        !ctx.backend.requests_to("/api/wishlist/").is_empty(),
        "login should load the wishlist"
    );
    ctx.post_form("/wishlist/toggle", &[("product_id", "1")]).await;

    ctx.logout().await;
    ctx.backend.clear_requests();

    let body = ctx.get_text("/wishlist").await;
    assert!(body.contains("Please log in to use your wishlist."));
    assert!(!body.contains("Dune</a>"));
    assert!(ctx.backend.requests_to("/api/wishlist/").is_empty());
}
