//! Authentication types.
//!
//! This module contains the persisted authentication state and the
//! vocabulary the box uses while an application waits for approval:
//! - [`CredentialRecord`] - The singleton record behind every box call
//! - [`AuthStatus`] - Lifecycle state of the local authentication
//! - [`ApprovalStatus`] - Status reported by the box for a pending request
//! - [`AppIdentity`] - The identity sent with an authorization request

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// API origin used when nothing else has been configured.
pub const DEFAULT_API_BASE_URL: &str = "https://192.168.0.254/api/v4/";

// ============================================================================
// Auth Status
// ============================================================================

/// Lifecycle state of the authentication with the box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// Fresh install, after logout, or after an approval timeout.
    #[default]
    NotStarted,
    /// Authorization requested, waiting for the button press on the box.
    WaitingApproval,
    /// The box granted access and a challenge is on hand.
    Authorized,
    /// A session token is available for authenticated calls.
    SessionCreated,
}

impl AuthStatus {
    /// Returns the wire/storage name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthStatus::NotStarted => "not_started",
            AuthStatus::WaitingApproval => "waiting_approval",
            AuthStatus::Authorized => "authorized",
            AuthStatus::SessionCreated => "session_created",
        }
    }

    /// Parses a stored status, falling back to `NotStarted` for anything unknown.
    pub fn from_str_lenient(raw: &str) -> Self {
        match raw {
            "waiting_approval" => AuthStatus::WaitingApproval,
            "authorized" => AuthStatus::Authorized,
            "session_created" => AuthStatus::SessionCreated,
            _ => AuthStatus::NotStarted,
        }
    }
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Approval Status
// ============================================================================

/// Status the box reports for a pending authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// The user has not pressed the button yet.
    Pending,
    /// The user approved the application on the box.
    Granted,
    /// The user refused the application on the box.
    Denied,
    /// The box stopped waiting for the button press.
    Timeout,
    /// The box does not know the track id, or sent something unexpected.
    Unknown,
}

impl ApprovalStatus {
    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Granted => "granted",
            ApprovalStatus::Denied => "denied",
            ApprovalStatus::Timeout => "timeout",
            ApprovalStatus::Unknown => "unknown",
        }
    }

    /// Returns true if the box will never grant this request.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(self, ApprovalStatus::Denied | ApprovalStatus::Timeout)
    }
}

impl From<&str> for ApprovalStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "pending" => ApprovalStatus::Pending,
            "granted" => ApprovalStatus::Granted,
            "denied" => ApprovalStatus::Denied,
            "timeout" => ApprovalStatus::Timeout,
            _ => ApprovalStatus::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for ApprovalStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ApprovalStatus::from(raw.as_str()))
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// App Identity
// ============================================================================

/// How this application introduces itself in an authorization request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppIdentity {
    /// Stable application identifier, also sent on session creation.
    pub app_id: String,
    /// Name shown on the box display while waiting for approval.
    pub app_name: String,
    /// Application version.
    pub app_version: String,
    /// Name of the device running the application.
    pub device_name: String,
}

impl Default for AppIdentity {
    fn default() -> Self {
        Self {
            app_id: "fr.freebox.magneto_freebox".to_string(),
            app_name: "Magneto Freebox".to_string(),
            app_version: "1.0".to_string(),
            device_name: "MagnetoFreebox".to_string(),
        }
    }
}

// ============================================================================
// Credential Record
// ============================================================================

/// The single persisted authentication record.
///
/// Invariants:
/// - `SessionCreated` implies `session_token` is set.
/// - `Authorized` implies both `challenge` and `app_token` are set.
///
/// Fields written by other versions of the application are kept in
/// [`CredentialRecord::extra`] and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialRecord {
    /// The box's API origin, always ending with `/`.
    pub api_base_url: String,

    /// Long-lived token issued once per installation.
    pub app_token: Option<String>,

    /// Short-lived token attached to every authenticated call.
    pub session_token: Option<String>,

    /// Identifier of the in-flight authorization request.
    pub track_id: Option<u64>,

    /// Current lifecycle state.
    #[serde(deserialize_with = "deserialize_status")]
    pub auth_status: AuthStatus,

    /// Single-use nonce consumed by session creation.
    pub challenge: Option<String>,

    /// When authorization was last requested (or a session last created).
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub last_auth_attempt: Option<DateTime<Utc>>,

    /// Unknown fields, preserved across load/save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for CredentialRecord {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}

impl CredentialRecord {
    /// Creates an empty record pointing at the given API origin.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            app_token: None,
            session_token: None,
            track_id: None,
            auth_status: AuthStatus::NotStarted,
            challenge: None,
            last_auth_attempt: None,
            extra: Map::new(),
        }
    }

    /// Returns true if a session can be created from this record.
    pub fn has_session_material(&self) -> bool {
        self.app_token.is_some() && self.challenge.is_some()
    }

    /// Checks the status invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvariantViolation`] naming the missing field.
    pub fn validate(&self) -> Result<(), CoreError> {
        let missing = match self.auth_status {
            AuthStatus::SessionCreated if self.session_token.is_none() => Some("session_token"),
            AuthStatus::Authorized if self.challenge.is_none() => Some("challenge"),
            AuthStatus::Authorized if self.app_token.is_none() => Some("app_token"),
            _ => None,
        };

        match missing {
            Some(missing) => Err(CoreError::InvariantViolation {
                status: self.auth_status,
                missing,
            }),
            None => Ok(()),
        }
    }

    /// Downgrades the status until the invariants hold.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.auth_status == AuthStatus::SessionCreated && self.session_token.is_none() {
            self.auth_status = AuthStatus::Authorized;
        }
        if self.auth_status == AuthStatus::Authorized && !self.has_session_material() {
            self.auth_status = AuthStatus::NotStarted;
        }
        self
    }

    /// Returns true once the approval window has elapsed.
    ///
    /// A record without `last_auth_attempt` is always considered stale.
    pub fn approval_expired(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        match self.last_auth_attempt {
            Some(at) => now - at > window,
            None => true,
        }
    }
}

// ============================================================================
// Lenient Deserializers
// ============================================================================

/// Parses a stored timestamp.
///
/// Accepts RFC 3339 and naive ISO-8601 timestamps, the latter interpreted in
/// local time as older records were written.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<AuthStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .map(AuthStatus::from_str_lenient)
        .unwrap_or_default())
}

// ============================================================================
// Tests
// ============================================================================
