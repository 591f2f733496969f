// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Magneto Fetch
//!
//! Client for the box's local REST API.
//!
//! This crate provides:
//!
//! - [`api::BoxApi`] - Trait over every call the dashboard makes to the box
//! - [`client::HttpBoxClient`] - `reqwest` implementation of that trait
//! - [`signing`] - HMAC-SHA1 password derivation for session creation
//! - [`envelope`] - Decoding of the box's `{success, result, msg}` envelope
//!
//! ## Example
//!
//! ```ignore
//! use magneto_fetch::{BoxApi, HttpBoxClient};
//!
//! let client = HttpBoxClient::new("https://192.168.0.254/api/v4/")?;
//! let challenge = client.challenge().await?;
//! let session = client.create_session(app_id, &app_token, &challenge).await?;
//! let channels = client.tv_channels(&session.session_token).await?;
//! ```

pub mod api;
pub mod client;
pub mod envelope;
pub mod error;
pub mod signing;

pub use api::{AuthorizationGrant, BoxApi, SessionGrant};
pub use client::{DEFAULT_TIMEOUT_SECS, HttpBoxClient, SESSION_HEADER, parse_base_url};
pub use error::BoxError;
pub use signing::session_password;
