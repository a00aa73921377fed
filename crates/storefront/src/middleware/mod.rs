//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with an empty `request_id` field)
//! 3. Request ID (fills the span field, tags the Sentry scope)
//! 4. Security headers (CSP naming the API origin for cover images)
//! 5. Session layer (tower-sessions with the evicting moka store)
//!
//! Authentication and role checks are extractors, not layers:
//! [`auth::Shopper`], [`auth::SignedIn`] and [`guard::RequireRole`].

pub mod auth;
pub mod guard;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{Shopper, SignedIn};
pub use guard::RequireRole;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
