// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # `Magneto` Core
//!
//! Core types, models, and listing helpers for the `Magneto` dashboard.
//!
//! This crate provides the foundational abstractions used across all other
//! `Magneto` crates, including:
//!
//! - Domain models (credential record, channels, recordings, programs)
//! - Error types
//! - The presentation assembler that turns live box data into view rows
//!
//! ## Key Types
//!
//! ### Authentication
//! - [`CredentialRecord`] - The single persisted authentication record
//! - [`AuthStatus`] - Lifecycle state of the box authentication
//! - [`ApprovalStatus`] - What the box reports while waiting for the button press
//! - [`AppIdentity`] - How this application introduces itself to the box
//!
//! ### TV & PVR
//! - [`Channel`] - A channel from the box's live catalog
//! - [`Recording`] - A scheduled recording from the PVR
//! - [`Program`] - The program currently airing on a channel
//!
//! ### Presentation
//! - [`ChannelView`] / [`RecordingView`] - View-ready rows
//! - [`ActionResult`] - Structured success/message value for callers

pub mod error;
pub mod listing;
pub mod models;

// Re-export error types
pub use error::CoreError;

// Re-export listing helpers
pub use listing::{
    ChannelView, RecordingView, box_origin, catalog_view, format_recordings, format_timestamp,
    normalize_logo_url, selected_view,
};

// Re-export all model types
pub use models::{
    // Authentication
    ActionResult,
    AppIdentity,
    ApprovalStatus,
    AuthStatus,
    CredentialRecord,
    DEFAULT_API_BASE_URL,
    // TV & PVR
    Channel,
    Program,
    Recording,
    parse_timestamp,
};
