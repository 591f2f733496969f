//! Core error types for `Magneto`.

use thiserror::Error;

use crate::models::AuthStatus;

/// Core error type for `Magneto` operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A credential record breaks one of its state invariants.
    #[error("Invalid credential record: {status} requires {missing}")]
    InvariantViolation {
        /// The status whose invariant does not hold.
        status: AuthStatus,
        /// The field that should have been present.
        missing: &'static str,
    },
}
