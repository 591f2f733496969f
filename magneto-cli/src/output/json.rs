//! JSON output formatting.

use anyhow::Result;
use chrono::{DateTime, Utc};
use magneto_core::{AuthStatus, CredentialRecord};
use serde::Serialize;

// ============================================================================
// Output Types
// ============================================================================

/// Credential snapshot. Tokens are reported only as presence flags.
#[derive(Debug, Serialize)]
pub struct CredentialsOutput {
    pub api_base_url: String,
    pub auth_status: AuthStatus,
    pub has_app_token: bool,
    pub has_session_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_auth_attempt: Option<DateTime<Utc>>,
}

impl From<&CredentialRecord> for CredentialsOutput {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            api_base_url: record.api_base_url.clone(),
            auth_status: record.auth_status,
            has_app_token: record.app_token.is_some(),
            has_session_token: record.session_token.is_some(),
            track_id: record.track_id,
            last_auth_attempt: record.last_auth_attempt,
        }
    }
}

/// Result of `auth start`.
#[derive(Debug, Serialize)]
pub struct AuthStartOutput {
    pub success: bool,
    pub message: String,
    pub status: AuthStatus,
    pub track_id: u64,
}

/// Result of `auth session`.
#[derive(Debug, Serialize)]
pub struct SessionOutput {
    pub success: bool,
    pub message: String,
    pub status: AuthStatus,
    pub permissions: Vec<String>,
}

/// Result of `channels toggle`.
#[derive(Debug, Serialize)]
pub struct ToggleOutput {
    pub success: bool,
    pub channel_id: String,
    pub selected: bool,
    pub selection: Vec<String>,
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}
