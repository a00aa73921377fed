//! Login, registration and role lookup.

use tracing::instrument;

use super::types::{LoginRequest, LoginResponse, LogoutRequest, RegisterRequest, UserInfo};
use super::{ApiClient, ApiResult};

impl ApiClient {
    /// Exchange credentials for a token pair.
    ///
    /// # Errors
    ///
    /// Returns the server's message on invalid credentials.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> ApiResult<LoginResponse> {
        self.post_json("/api/auth/login/", &LoginRequest { username, password })
            .await
    }

    /// Create an account. The caller signs in separately.
    ///
    /// # Errors
    ///
    /// Returns the first field error on rejected input.
    #[instrument(skip(self, password))]
    pub async fn register(&self, username: &str, email: &str, password: &str) -> ApiResult<()> {
        self.post_discard(
            "/api/auth/register/",
            &RegisterRequest {
                username,
                email,
                password,
            },
        )
        .await
    }

    /// Revoke a refresh token.
    ///
    /// # Errors
    ///
    /// Returns error if the API rejects the token.
    #[instrument(skip_all)]
    pub async fn logout(&self, refresh: &str) -> ApiResult<()> {
        self.post_discard("/api/auth/logout/", &LogoutRequest { refresh })
            .await
    }

    /// Fetch the signed-in user's roles.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the token is rejected.
    #[instrument(skip(self))]
    pub async fn user_info(&self) -> ApiResult<UserInfo> {
        self.get_json("/api/user-info/").await
    }
}
