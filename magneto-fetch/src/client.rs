//! `reqwest` implementation of [`BoxApi`].
//!
//! The box serves a self-signed certificate on the LAN, so certificate
//! verification is disabled for every call made through this client.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use magneto_core::{AppIdentity, ApprovalStatus, Channel, Program, Recording};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::api::{AuthorizationGrant, BoxApi, SessionGrant, channels_from_map};
use crate::envelope::decode;
use crate::error::BoxError;
use crate::signing::session_password;

/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Header carrying the session token on authenticated calls.
pub const SESSION_HEADER: &str = "X-Fbx-App-Auth";

/// User agent string for Magneto.
const USER_AGENT: &str = concat!("Magneto/", env!("CARGO_PKG_VERSION"));

/// Parses an API origin, appending a trailing `/` so relative endpoints join
/// below it rather than replacing its last segment.
///
/// # Errors
///
/// Returns [`BoxError::InvalidUrl`] for unparseable or non-HTTP URLs.
pub fn parse_base_url(raw: &str) -> Result<Url, BoxError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&with_slash).map_err(|e| BoxError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        _ => Err(BoxError::InvalidUrl(format!(
            "{raw}: expected an http(s) URL with a host"
        ))),
    }
}

// ============================================================================
// Response Payloads
// ============================================================================

#[derive(Debug, Deserialize)]
struct AuthStatusPayload {
    status: ApprovalStatus,
}

#[derive(Debug, Deserialize)]
struct ChallengePayload {
    challenge: String,
}

// ============================================================================
// HTTP Box Client
// ============================================================================

/// Box client backed by `reqwest`.
#[derive(Debug)]
pub struct HttpBoxClient {
    inner: Client,
    base: RwLock<Url>,
}

impl HttpBoxClient {
    /// Creates a client for `api_base_url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the TLS backend cannot be
    /// initialized.
    pub fn new(api_base_url: &str) -> Result<Self, BoxError> {
        Self::with_timeout(api_base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the TLS backend cannot be
    /// initialized.
    pub fn with_timeout(api_base_url: &str, timeout: Duration) -> Result<Self, BoxError> {
        let base = parse_base_url(api_base_url)?;

        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| BoxError::ClientBuild(e.to_string()))?;

        warn!(
            base_url = %base,
            "TLS certificate verification is disabled for box requests"
        );

        Ok(Self {
            inner,
            base: RwLock::new(base),
        })
    }

    /// Resolves an endpoint relative to the current API origin.
    fn endpoint(&self, path: &str) -> Result<Url, BoxError> {
        let base = self.base.read().unwrap_or_else(PoisonError::into_inner);
        base.join(path)
            .map_err(|e| BoxError::InvalidUrl(format!("{path}: {e}")))
    }

    /// Endpoint below `tv/channels/{channel_id}/`. The id is percent-encoded
    /// as one path segment.
    fn channel_endpoint(&self, channel_id: &str, tail: &[&str]) -> Result<Url, BoxError> {
        if matches!(channel_id, "" | "." | "..") {
            return Err(BoxError::InvalidUrl(format!("invalid channel id {channel_id:?}")));
        }

        let mut url = self.endpoint("tv/channels/")?;
        let invalid = BoxError::InvalidUrl(url.to_string());
        url.path_segments_mut()
            .map_err(|()| invalid)?
            .pop_if_empty()
            .push(channel_id)
            .extend(tail)
            .push("");
        Ok(url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BoxError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, len = body.len(), "Box response received");
        decode(status, &body)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        session_token: Option<&str>,
    ) -> Result<T, BoxError> {
        let url = self.endpoint(path)?;
        self.get_url(url, session_token).await
    }

    async fn get_url<T: DeserializeOwned>(
        &self,
        url: Url,
        session_token: Option<&str>,
    ) -> Result<T, BoxError> {
        debug!(url = %url, "GET");

        let mut request = self.inner.get(url);
        if let Some(token) = session_token {
            request = request.header(SESSION_HEADER, token);
        }
        self.send(request).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, BoxError> {
        let url = self.endpoint(path)?;
        debug!(url = %url, "POST");
        self.send(self.inner.post(url).json(body)).await
    }
}

#[async_trait]
impl BoxApi for HttpBoxClient {
    fn base_url(&self) -> String {
        self.base
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .to_string()
    }

    fn set_base_url(&self, url: &str) -> Result<(), BoxError> {
        let parsed = parse_base_url(url)?;
        debug!(base_url = %parsed, "Repointing box client");
        *self.base.write().unwrap_or_else(PoisonError::into_inner) = parsed;
        Ok(())
    }

    #[instrument(skip(self, app), fields(app_id = %app.app_id))]
    async fn request_authorization(
        &self,
        app: &AppIdentity,
    ) -> Result<AuthorizationGrant, BoxError> {
        let body = json!({
            "app_id": app.app_id,
            "app_name": app.app_name,
            "app_version": app.app_version,
            "device_name": app.device_name,
        });
        let grant: AuthorizationGrant = self.post("login/authorize/", &body).await?;
        debug!(track_id = grant.track_id, "Authorization requested");
        Ok(grant)
    }

    #[instrument(skip(self))]
    async fn auth_status(&self, track_id: u64) -> Result<ApprovalStatus, BoxError> {
        let payload: AuthStatusPayload = self
            .get(&format!("login/authorize/{track_id}"), None)
            .await?;
        debug!(status = %payload.status, "Approval status");
        Ok(payload.status)
    }

    #[instrument(skip(self))]
    async fn challenge(&self) -> Result<String, BoxError> {
        let payload: ChallengePayload = self.get("login/", None).await?;
        Ok(payload.challenge)
    }

    #[instrument(skip(self, app_token, challenge))]
    async fn create_session(
        &self,
        app_id: &str,
        app_token: &str,
        challenge: &str,
    ) -> Result<SessionGrant, BoxError> {
        let body = json!({
            "app_id": app_id,
            "password": session_password(app_token, challenge),
        });
        let grant: SessionGrant = self.post("login/session/", &body).await?;
        debug!(permissions = grant.permissions.len(), "Session opened");
        Ok(grant)
    }

    #[instrument(skip(self, session_token))]
    async fn tv_channels(&self, session_token: &str) -> Result<Vec<Channel>, BoxError> {
        let map: Option<BTreeMap<String, Channel>> =
            self.get("tv/channels/", Some(session_token)).await?;
        let channels = channels_from_map(map.unwrap_or_default());
        debug!(count = channels.len(), "Channels fetched");
        Ok(channels)
    }

    #[instrument(skip(self, session_token))]
    async fn scheduled_recordings(&self, session_token: &str) -> Result<Vec<Recording>, BoxError> {
        let recordings: Option<Vec<Recording>> =
            self.get("pvr/programmed/", Some(session_token)).await?;
        let recordings = recordings.unwrap_or_default();
        debug!(count = recordings.len(), "Recordings fetched");
        Ok(recordings)
    }

    #[instrument(skip(self, session_token))]
    async fn channel(&self, session_token: &str, channel_id: &str) -> Result<Channel, BoxError> {
        let url = self.channel_endpoint(channel_id, &[])?;
        let mut channel: Channel = self.get_url(url, Some(session_token)).await?;
        if channel.uuid.is_empty() {
            channel.uuid = channel_id.to_string();
        }
        Ok(channel)
    }

    #[instrument(skip(self, session_token))]
    async fn current_program(
        &self,
        session_token: &str,
        channel_id: &str,
    ) -> Result<Program, BoxError> {
        let url = self.channel_endpoint(channel_id, &["programs", "current"])?;
        self.get_url(url, Some(session_token)).await
    }
}

// ============================================================================
// Tests
// ============================================================================
