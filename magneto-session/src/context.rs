//! The per-process context handed to the driver.
//!
//! [`BoxContext`] owns the credential store, the selection store and the
//! box client, and exposes the dashboard operations on top of them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join;
use magneto_core::{
    AuthStatus, Channel, ChannelView, Program, RecordingView, catalog_view, format_recordings,
    normalize_logo_url, selected_view,
};
use magneto_fetch::{BoxApi, BoxError, HttpBoxClient};
use magneto_store::{
    CONFIG_FILE, CREDENTIALS_FILE, CredentialStore, MagnetoConfig, SELECTION_FILE, SelectionStore,
    default_config_dir,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AuthError;
use crate::machine::AuthMachine;

// ============================================================================
// View Types
// ============================================================================

/// Everything the main page shows.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// Authentication status.
    pub status: AuthStatus,
    /// Selected, available channels.
    pub channels: Vec<ChannelView>,
    /// Scheduled recordings.
    pub recordings: Vec<RecordingView>,
    /// Why recordings could not be loaded, if they could not.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pvr_error: Option<String>,
}

/// A channel with what it is airing now.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelDetails {
    /// The channel.
    pub channel: ChannelView,
    /// Current program, when the box knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_program: Option<Program>,
}

/// Turns a recordings failure into the message shown in place of the list.
pub fn pvr_error_message(err: &AuthError) -> String {
    match err {
        AuthError::SessionUnavailable(_) | AuthError::Box(BoxError::SessionExpired) => {
            "Access denied: authentication required for the PVR".to_string()
        }
        AuthError::Box(BoxError::NotFound) => "PVR endpoint not available on this box".to_string(),
        AuthError::Box(BoxError::Http { status, body }) => format!("PVR error: {status} - {body}"),
        AuthError::Box(BoxError::Rejected { message, .. }) => format!("PVR error: {message}"),
        other => format!("PVR not reachable: {other}"),
    }
}

// ============================================================================
// Box Context
// ============================================================================

/// Stores plus box client, built once per process.
#[derive(Debug)]
pub struct BoxContext {
    auth: AuthMachine,
    selection: SelectionStore,
    config: MagnetoConfig,
    data_dir: PathBuf,
}

impl BoxContext {
    /// Creates a builder for customizing the context.
    pub fn builder() -> BoxContextBuilder {
        BoxContextBuilder::new()
    }

    /// Loads the configuration from `data_dir` (or the default directory),
    /// builds the context and writes a default credential file on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub async fn load(data_dir: Option<PathBuf>) -> Result<Self, AuthError> {
        let data_dir = data_dir.unwrap_or_else(default_config_dir);
        let config = MagnetoConfig::load(&data_dir.join(CONFIG_FILE)).await;

        let context = Self::builder().data_dir(data_dir).config(config).build()?;
        context.auth.store().ensure_initialized().await;
        Ok(context)
    }

    /// Returns the authentication state machine.
    pub fn auth(&self) -> &AuthMachine {
        &self.auth
    }

    /// Returns the channel selection store.
    pub fn selection(&self) -> &SelectionStore {
        &self.selection
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MagnetoConfig {
        &self.config
    }

    /// Returns the data directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the config file location.
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    fn base_url(&self) -> String {
        self.auth.api().base_url()
    }

    async fn fetch_channels(&self) -> Result<Vec<Channel>, AuthError> {
        self.auth
            .with_session(|api, token| async move { api.tv_channels(&token).await })
            .await
    }

    /// Selected, available channels sorted by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no session or the box call fails.
    pub async fn channels(&self) -> Result<Vec<ChannelView>, AuthError> {
        let channels = self.fetch_channels().await?;
        let selection = self.selection.load().await;
        Ok(selected_view(&channels, &selection, &self.base_url()))
    }

    /// Every available channel with its selection flag.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no session or the box call fails.
    pub async fn catalog(&self) -> Result<Vec<ChannelView>, AuthError> {
        let channels = self.fetch_channels().await?;
        let selection = self.selection.load().await;
        Ok(catalog_view(&channels, &selection, &self.base_url()))
    }

    /// Scheduled recordings as display rows.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no session or the box call fails.
    pub async fn recordings(&self) -> Result<Vec<RecordingView>, AuthError> {
        let recordings = self
            .auth
            .with_session(|api, token| async move { api.scheduled_recordings(&token).await })
            .await?;
        Ok(format_recordings(&recordings))
    }

    /// Channels and recordings together. A recordings failure is reported in
    /// [`Dashboard::pvr_error`] and never fails the channel list.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel list cannot be loaded.
    pub async fn dashboard(&self) -> Result<Dashboard, AuthError> {
        let (channels, recordings) = join(self.channels(), self.recordings()).await;
        let channels = channels?;

        let (recordings, pvr_error) = match recordings {
            Ok(recordings) => (recordings, None),
            Err(e) => {
                warn!(error = %e, "Recordings unavailable");
                (Vec::new(), Some(pvr_error_message(&e)))
            }
        };

        Ok(Dashboard {
            status: self.auth.credentials().await.auth_status,
            channels,
            recordings,
            pvr_error,
        })
    }

    /// Adds or removes a channel from the selection.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Persistence`] if the selection cannot be saved.
    pub async fn toggle_channel(&self, channel_id: &str) -> Result<BTreeSet<String>, AuthError> {
        self.selection
            .toggle(channel_id)
            .await
            .map_err(|_| AuthError::Persistence(self.selection.path().display().to_string()))
    }

    /// A channel and its current program. A failed program lookup yields
    /// no program rather than an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel itself cannot be loaded.
    pub async fn channel_details(&self, channel_id: &str) -> Result<ChannelDetails, AuthError> {
        let id = channel_id.to_string();
        let channel = self
            .auth
            .with_session(|api, token| {
                let id = id.clone();
                async move { api.channel(&token, &id).await }
            })
            .await?;

        let current_program = match self
            .auth
            .with_session(|api, token| {
                let id = id.clone();
                async move { api.current_program(&token, &id).await }
            })
            .await
        {
            Ok(program) => Some(program),
            Err(e) => {
                debug!(channel_id, error = %e, "No current program");
                None
            }
        };

        let base_url = self.base_url();
        let selected = self.selection.contains(channel_id).await;
        Ok(ChannelDetails {
            channel: ChannelView {
                id: channel.uuid,
                name: channel.name,
                short_name: channel.short_name,
                logo: normalize_logo_url(channel.logo_url.as_deref(), &base_url),
                favorite: channel.favorite,
                selected,
            },
            current_program,
        })
    }
}

// ============================================================================
// Box Context Builder
// ============================================================================

/// Builder for constructing a [`BoxContext`].
#[derive(Default)]
pub struct BoxContextBuilder {
    data_dir: Option<PathBuf>,
    config: Option<MagnetoConfig>,
    api: Option<Arc<dyn BoxApi>>,
}

impl BoxContextBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory holding the credential, selection and config files.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: MagnetoConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the box client.
    #[must_use]
    pub fn api(mut self, api: Arc<dyn BoxApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Builds the context.
    ///
    /// # Errors
    ///
    /// Returns an error if no client was given and the HTTP client cannot be
    /// built from the configuration.
    pub fn build(self) -> Result<BoxContext, AuthError> {
        let data_dir = self.data_dir.unwrap_or_else(default_config_dir);
        let config = self.config.unwrap_or_default();

        let api: Arc<dyn BoxApi> = match self.api {
            Some(api) => api,
            None => Arc::new(HttpBoxClient::with_timeout(
                &config.default_api_base_url,
                config.request_timeout(),
            )?),
        };

        let store = CredentialStore::new(data_dir.join(CREDENTIALS_FILE))
            .with_default_api_base_url(config.default_api_base_url.clone());
        let auth = AuthMachine::new(store, api)
            .with_app(config.app.clone())
            .with_approval_timeout(config.approval_timeout());
        let selection = SelectionStore::new(data_dir.join(SELECTION_FILE));

        debug!(data_dir = %data_dir.display(), "Context built");
        Ok(BoxContext {
            auth,
            selection,
            config,
            data_dir,
        })
    }
}

impl std::fmt::Debug for BoxContextBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxContextBuilder")
            .field("data_dir", &self.data_dir)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
