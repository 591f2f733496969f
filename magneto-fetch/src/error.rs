//! Box client error types.

use thiserror::Error;

/// Error type for calls to the box.
///
/// Transport failures are kept apart from application-level rejections so
/// callers can choose between retrying with a refreshed session and
/// surfacing the failure to the user.
#[derive(Debug, Clone, Error)]
pub enum BoxError {
    /// DNS, connect or timeout failure.
    #[error("Connection to the box failed: {0}")]
    Transport(String),

    /// The box answered `success: false`.
    #[error("Box rejected the request: {message}")]
    Rejected {
        /// Message from the box.
        message: String,
        /// Machine-readable error code from the box.
        error_code: Option<String>,
    },

    /// HTTP 403 with `auth_required`: the session expired or is missing.
    #[error("Session expired or missing")]
    SessionExpired,

    /// HTTP 404 without a box envelope.
    #[error("Endpoint not available on this box")]
    NotFound,

    /// Any other non-success HTTP status without a box envelope.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        body: String,
    },

    /// The body was not the expected JSON.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The configured API origin is not a usable URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl BoxError {
    /// Returns true for failures the caller may simply retry later.
    pub fn is_transient(&self) -> bool {
        matches!(self, BoxError::Transport(_))
    }
}

impl From<reqwest::Error> for BoxError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BoxError::Transport(format!("Request timed out: {err}"))
        } else if err.is_connect() {
            BoxError::Transport(format!("Connection failed: {err}"))
        } else if err.is_builder() {
            BoxError::ClientBuild(err.to_string())
        } else {
            BoxError::Transport(err.to_string())
        }
    }
}
