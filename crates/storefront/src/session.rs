//! Typed access to the shopper's session.
//!
//! Everything the storefront remembers about a browser lives in one
//! [`StoredSession`] record under a single session key. Handlers read and
//! change it only through [`AuthSession`]; no other code touches raw keys.

use axum::{extract::FromRequestParts, http::request::Parts};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::api::types::LoginResponse;
use crate::error::AppError;

/// Session keys.
pub mod keys {
    /// Key for the shopper's [`super::StoredSession`] record.
    pub const SHOPPER: &str = "shopper";
}

/// Per-browser authentication state, persisted in the session store.
///
/// Tokens are opaque: they are not validated or refreshed locally.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct StoredSession {
    pub authenticated: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub username: Option<String>,
    /// Identifies this browser's client context (API cookie jar, cart, wishlist).
    pub context_key: Uuid,
}

impl std::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredSession")
            .field("authenticated", &self.authenticated)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("username", &self.username)
            .field("context_key", &self.context_key)
            .finish()
    }
}

impl StoredSession {
    fn fresh() -> Self {
        Self {
            context_key: Uuid::new_v4(),
            ..Self::default()
        }
    }
}

/// The session store handle plus the decoded record.
#[derive(Debug, Clone)]
pub struct AuthSession {
    session: Session,
    state: StoredSession,
}

impl AuthSession {
    /// Load the record, creating and persisting a fresh one on first visit.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read or written.
    pub async fn load(session: Session) -> Result<Self, tower_sessions::session::Error> {
        let state = match session.get::<StoredSession>(keys::SHOPPER).await? {
            Some(state) => state,
            None => {
                let state = StoredSession::fresh();
                session.insert(keys::SHOPPER, &state).await?;
                state
            }
        };

        Ok(Self { session, state })
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.state.authenticated && self.state.access_token.is_some()
    }

    /// Bearer token for API calls.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.state
            .access_token
            .as_deref()
            .map(|token| SecretString::from(token.to_owned()))
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.state.refresh_token.as_deref()
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.state.username.as_deref()
    }

    #[must_use]
    pub const fn context_key(&self) -> Uuid {
        self.state.context_key
    }

    /// Record a successful login.
    ///
    /// The session id is rotated so a pre-login cookie cannot ride along.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub async fn sign_in(&mut self, login: &LoginResponse) -> Result<(), tower_sessions::session::Error> {
        self.state.authenticated = true;
        self.state.access_token = Some(login.access.clone());
        self.state.refresh_token = Some(login.refresh.clone());
        self.state.username = Some(login.username.clone());

        self.session.cycle_id().await?;
        self.save().await
    }

    /// Forget tokens and the username. The context key is kept so the
    /// anonymous cart stays with the browser.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be written.
    pub async fn sign_out(&mut self) -> Result<(), tower_sessions::session::Error> {
        self.state.authenticated = false;
        self.state.access_token = None;
        self.state.refresh_token = None;
        self.state.username = None;
        self.save().await
    }

    async fn save(&self) -> Result<(), tower_sessions::session::Error> {
        self.session.insert(keys::SHOPPER, &self.state).await
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        Ok(Self::load(session).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn session() -> Session {
        Session::new(
            None,
            Arc::new(crate::middleware::session::create_session_store()),
            None,
        )
    }

    fn login() -> LoginResponse {
        LoginResponse {
            access: "access-token".to_string(),
            refresh: "refresh-token".to_string(),
            username: "ada".to_string(),
            email: None,
        }
    }

    #[tokio::test]
    async fn test_load_creates_record_once() {
        let session = session();
        let first = AuthSession::load(session.clone()).await.unwrap();
        let second = AuthSession::load(session).await.unwrap();

        assert!(!first.is_authenticated());
        assert_eq!(first.context_key(), second.context_key());
    }

    #[tokio::test]
    async fn test_sign_in_then_out_keeps_context_key() {
        let mut auth = AuthSession::load(session()).await.unwrap();
        let key = auth.context_key();

        auth.sign_in(&login()).await.unwrap();
        assert!(auth.is_authenticated());
        assert_eq!(auth.username(), Some("ada"));
        assert_eq!(auth.refresh_token(), Some("refresh-token"));

        auth.sign_out().await.unwrap();
        assert!(!auth.is_authenticated());
        assert!(auth.access_token().is_none());
        assert_eq!(auth.context_key(), key);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let state = StoredSession {
            authenticated: true,
            access_token: Some("very-secret-access".to_string()),
            refresh_token: Some("very-secret-refresh".to_string()),
            username: Some("ada".to_string()),
            context_key: Uuid::nil(),
        };
        let debug = format!("{state:?}");
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("ada"));
    }
}
