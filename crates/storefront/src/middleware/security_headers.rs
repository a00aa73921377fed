//! Security headers middleware.
//!
//! Pages only ever load from the storefront itself, except cover images,
//! which the bookstore API serves. The policy names the API's origin for
//! those and nothing else.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};
use url::Url;

use crate::state::AppState;

/// Content Security Policy for storefront pages.
///
/// Invoices arrive as complete HTML documents with inline styles, so
/// `style-src` allows them.
#[must_use]
pub fn content_security_policy(api_base_url: &Url, upgrade_insecure: bool) -> String {
    let api_origin = api_base_url.origin().ascii_serialization();
    let mut policy = format!(
        "default-src 'none'; \
         style-src 'self' 'unsafe-inline'; \
         img-src 'self' data: {api_origin}; \
         form-action 'self'; \
         base-uri 'self'; \
         frame-ancestors 'none'"
    );
    if upgrade_insecure {
        policy.push_str("; upgrade-insecure-requests");
    }
    policy
}

/// Add security headers to all responses.
///
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: same-origin` (the `?from=` redirect must survive)
/// - `Content-Security-Policy` from [`content_security_policy`]
/// - `Permissions-Policy` denying sensors, camera and payment APIs
/// - `Cache-Control: no-store` (every page is per-shopper)
/// - `Cross-Origin-Opener-Policy: same-origin`
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;

    let config = state.config();
    let policy = content_security_policy(&config.api.base_url, config.secure_cookies());
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));

    if let Ok(value) = HeaderValue::from_str(&policy) {
        headers.insert(CONTENT_SECURITY_POLICY, value);
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), camera=(), geolocation=(), gyroscope=(), \
             magnetometer=(), microphone=(), payment=(), usb=()",
        ),
    );

    // a handler's own caching wins
    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}
