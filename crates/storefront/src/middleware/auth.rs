//! Shopper extractors.
//!
//! [`Shopper`] pairs the typed session with its client context and is what
//! almost every handler takes. [`SignedIn`] additionally requires a logged-in
//! shopper and redirects to the login page otherwise.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};

use crate::error::AppError;
use crate::services::context::SessionContext;
use crate::session::AuthSession;
use crate::state::AppState;

/// Login page path, with a notice for the shopper.
pub const LOGIN_REDIRECT: &str = "/auth/login?info=Please%20log%20in%20to%20continue.";

/// The current browser session and its API client context.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(shopper: Shopper) -> impl IntoResponse {
///     format!("{} items in cart", shopper.ctx.cart().item_count())
/// }
/// ```
#[derive(Clone)]
pub struct Shopper {
    pub session: AuthSession,
    pub ctx: Arc<SessionContext>,
}

impl<S> FromRequestParts<S> for Shopper
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = AuthSession::from_request_parts(parts, state).await?;
        let app = AppState::from_ref(state);

        let ctx = app
            .contexts()
            .get_or_create(&session)
            .await
            .map_err(|e| AppError::Internal(format!("client context: {e}")))?;

        Ok(Self { session, ctx })
    }
}

/// A [`Shopper`] that is logged in.
pub struct SignedIn(pub Shopper);

/// Error returned when a page needs a logged-in shopper.
pub enum AuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// Session or context could not be loaded.
    Failed(AppError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_REDIRECT).into_response(),
            Self::Failed(err) => err.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for SignedIn
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shopper = Shopper::from_request_parts(parts, state)
            .await
            .map_err(AuthRejection::Failed)?;

        if !shopper.session.is_authenticated() {
            return Err(AuthRejection::RedirectToLogin);
        }

        Ok(Self(shopper))
    }
}
