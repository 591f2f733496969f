//! CLI command implementations.

pub mod auth;
pub mod channels;
pub mod config;
pub mod dashboard;
pub mod recordings;
