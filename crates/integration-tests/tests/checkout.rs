//! Integration tests for checkout.
//!
//! The sequence is: save the address to the profile, place the order, pay.
//! A failure at any step stops the rest and shows the API's message.

use bindery_integration_tests::{TestContext, checkout_form, location};
use reqwest::StatusCode;

/// Paths of the mutating calls checkout made, in order.
fn checkout_calls(ctx: &TestContext) -> Vec<String> {
    ctx.backend
        .requests()
        .into_iter()
        .filter(|r| r.method == "POST")
        .map(|r| r.path)
        .filter(|p| {
            p.starts_with("/profile/edit/")
                || p.starts_with("/api/orders/place/")
                || p.starts_with("/api/payment/")
        })
        .collect()
}

async fn signed_in_with_cart() -> TestContext {
    let ctx = TestContext::new().await;
    ctx.login("reader").await;
    ctx.post_form("/cart/add", &[("product_id", "1"), ("quantity", "2")])
        .await;
    ctx
}

fn form_without(field: &str) -> Vec<(&'static str, &'static str)> {
    checkout_form()
        .into_iter()
        .map(|(k, v)| if k == field { (k, "") } else { (k, v) })
        .collect()
}

#[tokio::test]
async fn test_checkout_requires_login() {
    let ctx = TestContext::new().await;

    let response = ctx.get("/checkout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/auth/login"));
}

#[tokio::test]
async fn test_checkout_runs_steps_in_order() {
    let ctx = signed_in_with_cart().await;

    let response = ctx.post_form("/checkout", &checkout_form()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.text().await.expect("body");

    assert!(body.contains("Payment successful."));
    assert!(body.contains("url=/profile/transactions"));
    assert!(body.contains(r#"href="/checkout/invoice" target="_blank""#));
    assert_eq!(
        checkout_calls(&ctx),
        ["/profile/edit/", "/api/orders/place/", "/api/payment/process/1/"]
    );

    assert_eq!(ctx.backend.profile()["city"], "London");
    let payment = ctx
        .backend
        .requests_to("/api/payment/process/")
        .pop()
        .expect("payment request");
    assert_eq!(payment.body["card_number"], "4111111111111111");
}

#[tokio::test]
async fn test_invoice_is_served_after_payment() {
    let ctx = signed_in_with_cart().await;
    ctx.post_form("/checkout", &checkout_form()).await;

    let body = ctx.get_text("/checkout/invoice").await;
    assert!(body.contains("Invoice for order #1"));
}

#[tokio::test]
async fn test_missing_field_stops_before_any_request() {
    let ctx = signed_in_with_cart().await;

    let body = ctx
        .post_form("/checkout", &form_without("city"))
        .await
        .text()
        .await
        .expect("body");

    assert!(body.contains("Please fill in your city."));
    assert!(checkout_calls(&ctx).is_empty());
}

#[tokio::test]
async fn test_missing_card_stops_before_any_request() {
    let ctx = signed_in_with_cart().await;

    let body = ctx
        .post_form("/checkout", &form_without("cvv"))
        .await
        .text()
        .await
        .expect("body");

    assert!(body.contains("Please enter your card number, expiry date and CVV."));
    assert!(checkout_calls(&ctx).is_empty());
}

#[tokio::test]
async fn test_place_order_failure_skips_payment() {
    let ctx = TestContext::new().await;
    ctx.login("reader").await;

    let body = ctx
        .post_form("/checkout", &checkout_form())
        .await
        .text()
        .await
        .expect("body");

    assert!(body.contains("Your cart is empty."));
    assert_eq!(
        checkout_calls(&ctx),
        ["/profile/edit/", "/api/orders/place/"]
    );
}

#[tokio::test]
async fn test_declined_payment_offers_pending_order() {
    let ctx = signed_in_with_cart().await;
    ctx.backend.set_decline_payments(true);

    let body = ctx
        .post_form("/checkout", &checkout_form())
        .await
        .text()
        .await
        .expect("body");
    assert!(body.contains("Card declined."));
    assert!(body.contains(r#"action="/checkout/pending/1""#));
    assert!(!body.contains("4111"), "card details must not be echoed back");
    assert_eq!(ctx.backend.orders().len(), 1);

    ctx.backend.set_decline_payments(false);
    let response = ctx
        .post_form(
            "/checkout/pending/1",
            &[("card_number", "4111111111111111"), ("expiry", "12/30"), ("cvv", "123")],
        )
        .await;
    let body = response.text().await.expect("body");
    assert!(body.contains("Payment successful."));

    // No second order was placed
    assert_eq!(ctx.backend.orders().len(), 1);
    assert!(!ctx.get_text("/checkout").await.contains("/checkout/pending/"));
}

#[tokio::test]
async fn test_paying_an_unknown_pending_order_is_refused() {
    let ctx = signed_in_with_cart().await;

    let response = ctx
        .post_form(
            "/checkout/pending/42",
            &[("card_number", "4111111111111111"), ("expiry", "12/30"), ("cvv", "123")],
        )
        .await;

    assert!(location(&response).starts_with("/checkout?error="));
    assert!(ctx.backend.requests_to("/api/payment/").is_empty());
}

#[tokio::test]
async fn test_checkout_form_is_prefilled_from_profile() {
    let ctx = signed_in_with_cart().await;
    ctx.post_form(
        "/profile",
        &[
            ("name", "Ada Lovelace"),
            ("email", "ada@example.com"),
            ("phone_number", "555-0100"),
            ("address_line1", "12 Analytical Row"),
            ("address_line2", ""),
            ("city", "London"),
            ("postal_code", "N1 9GU"),
            ("password", ""),
        ],
    )
    .await;

    let body = ctx.get_text("/checkout").await;
    assert!(body.contains(r#"value="12 Analytical Row""#));
}
