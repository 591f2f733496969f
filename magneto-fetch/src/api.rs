//! The box API surface.

use std::collections::BTreeMap;

use async_trait::async_trait;
use magneto_core::{AppIdentity, ApprovalStatus, Channel, Program, Recording};
use serde::{Deserialize, Serialize};

use crate::error::BoxError;

// ============================================================================
// Grant Types
// ============================================================================

/// Result of `POST login/authorize/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationGrant {
    /// Identifier used to poll the approval status.
    pub track_id: u64,
    /// Long-lived token generated by the box for this installation.
    pub app_token: String,
}

/// Result of `POST login/session/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionGrant {
    /// Session token for the `X-Fbx-App-Auth` header.
    pub session_token: String,
    /// Permissions granted to the session.
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
}

// ============================================================================
// BoxApi Trait
// ============================================================================

/// Every call the dashboard makes to the box.
///
/// Implementations must be cheap to share; the state machine holds one behind
/// an `Arc` and calls it without holding any lock.
#[async_trait]
pub trait BoxApi: Send + Sync {
    /// Returns the API origin, always ending with `/`.
    fn base_url(&self) -> String;

    /// Repoints the client at a new API origin.
    ///
    /// # Errors
    ///
    /// Returns [`BoxError::InvalidUrl`] if the URL does not parse.
    fn set_base_url(&self, url: &str) -> Result<(), BoxError>;

    /// Requests a new app token. The user must approve it on the box.
    async fn request_authorization(
        &self,
        app: &AppIdentity,
    ) -> Result<AuthorizationGrant, BoxError>;

    /// Reads the approval status of a pending authorization.
    async fn auth_status(&self, track_id: u64) -> Result<ApprovalStatus, BoxError>;

    /// Fetches a fresh single-use challenge.
    async fn challenge(&self) -> Result<String, BoxError>;

    /// Opens a session by signing `challenge` with `app_token`.
    async fn create_session(
        &self,
        app_id: &str,
        app_token: &str,
        challenge: &str,
    ) -> Result<SessionGrant, BoxError>;

    /// Opens a new session without user interaction.
    async fn refresh_session(&self, app_id: &str, app_token: &str) -> Result<SessionGrant, BoxError> {
        let challenge = self.challenge().await?;
        self.create_session(app_id, app_token, &challenge).await
    }

    /// Lists the TV channel catalog.
    async fn tv_channels(&self, session_token: &str) -> Result<Vec<Channel>, BoxError>;

    /// Lists scheduled PVR recordings.
    async fn scheduled_recordings(&self, session_token: &str) -> Result<Vec<Recording>, BoxError>;

    /// Fetches a single channel.
    async fn channel(&self, session_token: &str, channel_id: &str) -> Result<Channel, BoxError>;

    /// Fetches the program currently airing on a channel.
    async fn current_program(
        &self,
        session_token: &str,
        channel_id: &str,
    ) -> Result<Program, BoxError>;
}

/// Flattens the box's `uuid -> channel` map, filling in missing identifiers
/// from the map keys.
pub(crate) fn channels_from_map(map: BTreeMap<String, Channel>) -> Vec<Channel> {
    map.into_iter()
        .map(|(key, mut channel)| {
            if channel.uuid.is_empty() {
                channel.uuid = key;
            }
            channel
        })
        .collect()
}
