//! Per-browser client context.
//!
//! A [`SessionContext`] bundles everything one browser session uses to talk
//! to the bookstore API: the client (with its own cookie jar), the
//! authentication flag the wishlist follows, both coordinators and the
//! checkout recovery state. Contexts are created lazily and kept in a
//! [`ContextRegistry`] keyed by the session's context key.

use std::sync::Arc;
use std::time::Duration;

use bindery_core::OrderId;
use moka::future::Cache;
use tokio::sync::{Mutex, watch};
use uuid::Uuid;

use crate::api::{ApiClient, ApiResult};
use crate::config::ApiConfig;
use crate::services::cart::CartCoordinator;
use crate::services::wishlist::WishlistCoordinator;
use crate::session::AuthSession;

/// Contexts idle this long are dropped (matches the session cookie expiry).
const CONTEXT_IDLE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Upper bound on live contexts, and on stored sessions.
pub const MAX_CONTEXTS: u64 = 10_000;

/// Checkout progress that must survive between requests.
#[derive(Debug, Clone, Default)]
pub struct CheckoutState {
    /// Order placed whose payment has not gone through.
    pub pending_payment: Option<OrderId>,
    /// Invoice markup from the last successful payment.
    pub last_invoice: Option<String>,
}

pub struct SessionContext {
    api: ApiClient,
    auth: watch::Sender<bool>,
    cart: CartCoordinator,
    wishlist: WishlistCoordinator,
    checkout: Mutex<CheckoutState>,
}

impl SessionContext {
    /// Build a context for `session`, restoring its token and loading the
    /// cart and wishlist. Only client construction can fail; the initial
    /// loads are best effort.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub async fn build(config: &ApiConfig, session: &AuthSession) -> ApiResult<Arc<Self>> {
        let api = ApiClient::new(config)?;
        let authenticated = session.is_authenticated();
        api.set_access_token(session.access_token()).await;

        let (auth, auth_rx) = watch::channel(authenticated);
        let ctx = Arc::new(Self {
            cart: CartCoordinator::new(api.clone()),
            wishlist: WishlistCoordinator::new(api.clone(), auth_rx),
            api,
            auth,
            checkout: Mutex::new(CheckoutState::default()),
        });

        if let Err(e) = ctx.api.prime_csrf().await {
            tracing::warn!(error = %e, "Could not prime CSRF cookie");
        }
        let _ = ctx.cart.fetch().await;
        let _ = ctx.wishlist.fetch().await;

        tracing::debug!(context_key = %session.context_key(), authenticated, "Client context created");
        Ok(ctx)
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub const fn cart(&self) -> &CartCoordinator {
        &self.cart
    }

    #[must_use]
    pub const fn wishlist(&self) -> &WishlistCoordinator {
        &self.wishlist
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        *self.auth.borrow()
    }

    /// Bring the client in line with the stored session, e.g. after a
    /// restart lost the in-memory token or another tab signed out.
    pub async fn sync_with(&self, session: &AuthSession) {
        let authenticated = session.is_authenticated();
        if authenticated == self.is_authenticated() {
            return;
        }

        self.api.set_access_token(session.access_token()).await;
        self.auth.send_replace(authenticated);
        let _ = self.cart.fetch().await;
    }

    /// Attach a fresh token and reload the cart under the new identity.
    pub async fn sign_in(&self, session: &AuthSession) {
        self.api.set_access_token(session.access_token()).await;
        self.auth.send_replace(true);
        let _ = self.cart.fetch().await;
    }

    /// Drop the token, clear per-user state and reload the anonymous cart.
    pub async fn sign_out(&self) {
        self.api.set_access_token(None).await;
        self.auth.send_replace(false);
        self.wishlist.clear();
        *self.checkout.lock().await = CheckoutState::default();
        let _ = self.cart.fetch().await;
    }

    pub async fn checkout_state(&self) -> CheckoutState {
        self.checkout.lock().await.clone()
    }

    pub async fn remember_pending_payment(&self, order: OrderId) {
        self.checkout.lock().await.pending_payment = Some(order);
    }

    /// Record a completed payment: clears the pending order and keeps the invoice.
    pub async fn complete_payment(&self, invoice_html: Option<String>) {
        let mut checkout = self.checkout.lock().await;
        checkout.pending_payment = None;
        if invoice_html.is_some() {
            checkout.last_invoice = invoice_html;
        }
    }
}

/// Live client contexts, one per browser session.
#[derive(Clone)]
pub struct ContextRegistry {
    api: ApiConfig,
    contexts: Cache<Uuid, Arc<SessionContext>>,
}

impl ContextRegistry {
    #[must_use]
    pub fn new(api: ApiConfig) -> Self {
        let contexts = Cache::builder()
            .max_capacity(MAX_CONTEXTS)
            .time_to_idle(CONTEXT_IDLE_TTL)
            .build();

        Self { api, contexts }
    }

    /// Context for the session, created on first use.
    ///
    /// Concurrent first requests from the same browser share one build.
    ///
    /// # Errors
    ///
    /// Returns the build error if the context had to be created and failed.
    pub async fn get_or_create(
        &self,
        session: &AuthSession,
    ) -> Result<Arc<SessionContext>, Arc<crate::api::ApiError>> {
        let ctx = self
            .contexts
            .try_get_with(
                session.context_key(),
                SessionContext::build(&self.api, session),
            )
            .await?;

        ctx.sync_with(session).await;
        Ok(ctx)
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.contexts.entry_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
