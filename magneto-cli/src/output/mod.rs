//! Output formatting for CLI.

mod json;
mod text;

pub use json::{AuthStartOutput, CredentialsOutput, JsonFormatter, SessionOutput, ToggleOutput};
pub use text::TextFormatter;
