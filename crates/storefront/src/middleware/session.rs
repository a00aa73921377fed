//! Session middleware configuration.
//!
//! Sessions are held in memory: they only carry API tokens and a context
//! key, and a restart simply signs everyone out. The moka-backed store drops
//! records once their expiry passes and caps how many it keeps, so anonymous
//! visitors cannot grow it without bound.

use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_moka_store::MokaStore;

use crate::config::StorefrontConfig;
use crate::services::context::MAX_CONTEXTS;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "bindery_session";

/// Session expiry time in seconds (7 days).
const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Evicting session store, sized like the context registry.
#[must_use]
pub fn create_session_store() -> MokaStore {
    MokaStore::new(Some(MAX_CONTEXTS))
}

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MokaStore> {
    SessionManagerLayer::new(create_session_store())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.secure_cookies())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
