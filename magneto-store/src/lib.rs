// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Magneto Store
//!
//! Local state for Magneto.
//!
//! This crate provides:
//!
//! - **CredentialStore**: The persisted authentication record
//! - **SelectionStore**: The set of channels the user wants to see
//! - **MagnetoConfig**: Application configuration
//! - **Persistence**: Atomic, owner-only JSON file helpers
//!
//! ## Usage
//!
//! ```ignore
//! use magneto_store::{CredentialStore, SelectionStore};
//!
//! let credentials = CredentialStore::at_default_path();
//! let record = credentials.load().await;
//!
//! let selection = SelectionStore::at_default_path();
//! let visible = selection.toggle("uuid-webtv-612").await;
//! ```

pub mod config;
pub mod credential_store;
pub mod error;
pub mod persistence;
pub mod selection_store;

pub use config::MagnetoConfig;
pub use credential_store::CredentialStore;
pub use error::StoreError;
pub use persistence::{
    CONFIG_FILE, CREDENTIALS_FILE, SELECTION_FILE, default_config_dir, default_config_path,
    default_credentials_path, default_selection_path, ensure_dir, load_json, load_json_or_default,
    save_json,
};
pub use selection_store::SelectionStore;

#[cfg(test)]
mod persistence_tests;
