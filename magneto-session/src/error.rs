//! Authentication error types.

use magneto_core::{ActionResult, AuthStatus};
use magneto_fetch::BoxError;
use thiserror::Error;

/// Errors surfaced by the authentication state machine.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The box refused or could not receive the authorization request.
    #[error("Authorization request failed: {0}")]
    AuthorizationRequestFailed(#[source] BoxError),

    /// No usable session, even after a silent refresh.
    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    /// The approval window elapsed before the user pressed the button.
    #[error("Authorization timed out waiting for approval on the box")]
    AuthorizationTimeout,

    /// The action is not allowed in the current state.
    #[error("Cannot {action} while {status}")]
    InvalidState {
        /// What was attempted.
        action: &'static str,
        /// The state at the time.
        status: AuthStatus,
    },

    /// A data file could not be written.
    #[error("Failed to write {0}")]
    Persistence(String),

    /// A box call failed.
    #[error(transparent)]
    Box(#[from] BoxError),
}

impl AuthError {
    /// Returns true for failures the caller may retry as-is.
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::AuthorizationRequestFailed(e) | AuthError::Box(e) => e.is_transient(),
            _ => false,
        }
    }
}

impl From<&AuthError> for ActionResult {
    fn from(err: &AuthError) -> Self {
        let result = ActionResult::failure(err.to_string());
        match err {
            AuthError::InvalidState { status, .. } => result.with_status(*status),
            AuthError::AuthorizationTimeout | AuthError::AuthorizationRequestFailed(_) => {
                result.with_status(AuthStatus::NotStarted)
            }
            _ => result,
        }
    }
}

impl From<AuthError> for ActionResult {
    fn from(err: AuthError) -> Self {
        ActionResult::from(&err)
    }
}
