//! Structured results handed to callers.

use serde::{Deserialize, Serialize};

use super::AuthStatus;

/// Outcome of a user-facing action: a success flag plus a message.
///
/// Every error raised by the core ends up as one of these at the edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the action succeeded.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
    /// Authentication status after the action, when relevant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AuthStatus>,
}

impl ActionResult {
    /// Creates a successful result.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            status: None,
        }
    }

    /// Creates a failed result.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            status: None,
        }
    }

    /// Attaches the authentication status.
    #[must_use]
    pub fn with_status(mut self, status: AuthStatus) -> Self {
        self.status = Some(status);
        self
    }
}
