//! Domain models for Magneto.
//!
//! ## Submodules
//!
//! - [`auth`] - Credential record, authentication states, app identity
//! - [`tv`] - Channels, recordings and programs as the box reports them
//! - [`result`] - Structured action results handed to callers

mod auth;
mod result;
mod tv;

pub use auth::{
    AppIdentity, ApprovalStatus, AuthStatus, CredentialRecord, DEFAULT_API_BASE_URL,
    parse_timestamp,
};
pub use result::ActionResult;
pub use tv::{Channel, Program, Recording};
