//! Configuration management.

use magneto_core::{AppIdentity, DEFAULT_API_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::persistence::{load_json, save_json};

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagnetoConfig {
    /// API origin used when the credential record has none.
    #[serde(default = "default_api_base_url")]
    pub default_api_base_url: String,
    /// Timeout for every call to the box, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// How long a pending authorization may wait for approval, in seconds.
    #[serde(default = "default_approval_timeout")]
    pub approval_timeout_secs: u64,
    /// Interval of the CLI wait loop, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Identity announced to the box when requesting authorization.
    #[serde(default)]
    pub app: AppIdentity,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_approval_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    2
}

impl Default for MagnetoConfig {
    fn default() -> Self {
        Self {
            default_api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
            approval_timeout_secs: default_approval_timeout(),
            poll_interval_secs: default_poll_interval(),
            app: AppIdentity::default(),
        }
    }
}

impl MagnetoConfig {
    /// Loads configuration, falling back to defaults when the file is missing
    /// or unreadable.
    pub async fn load(path: &Path) -> Self {
        match load_json::<Self>(path).await {
            Ok(config) => {
                info!(path = %path.display(), "Loaded configuration");
                config
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "Config file not found, using defaults");
                Self::default()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config file, using defaults");
                Self::default()
            }
        }
    }

    /// Saves configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<(), StoreError> {
        save_json(path, self).await?;
        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Box call timeout. Zero is treated as one second.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Approval window for a pending authorization. Zero is treated as one
    /// second.
    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_secs.max(1))
    }

    /// Interval between approval polls. Zero is treated as one second.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
