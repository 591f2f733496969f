// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Magneto Session
//!
//! Authentication with the box and the dashboard built on top of it.
//!
//! This crate provides:
//!
//! - [`AuthMachine`] - The pairing/session lifecycle
//!   (`not_started` → `waiting_approval` → `authorized` → `session_created`)
//! - [`BoxContext`] - The per-process object owning the stores and the box
//!   client, with the channel, recording and dashboard operations
//! - [`AuthError`] - Errors surfaced to the driver, convertible into
//!   [`magneto_core::ActionResult`]

pub mod context;
pub mod error;
pub mod machine;

pub use context::{BoxContext, BoxContextBuilder, ChannelDetails, Dashboard, pvr_error_message};
pub use error::AuthError;
pub use machine::{AuthMachine, DEFAULT_APPROVAL_TIMEOUT, PollOutcome, describe_status};

#[cfg(test)]
mod machine_tests;
#[cfg(test)]
mod test_support;
