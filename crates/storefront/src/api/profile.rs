//! Profile view and edit.

use tracing::instrument;

use super::types::{Profile, ProfileUpdate};
use super::{ApiClient, ApiResult};

impl ApiClient {
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self))]
    pub async fn get_profile(&self) -> ApiResult<Profile> {
        self.get_json("/profile/").await
    }

    /// Save profile fields and return the stored profile.
    ///
    /// # Errors
    ///
    /// Returns the server's field errors on rejected input.
    #[instrument(skip(self))]
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<Profile> {
        self.post_json("/profile/edit/", update).await
    }
}
