// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Magneto CLI - TV channels and PVR recordings from a Freebox.
//!
//! # Examples
//!
//! ```bash
//! # Pair with the box (press the button on the box when asked)
//! magneto auth start --wait
//!
//! # Show selected channels and scheduled recordings
//! magneto
//!
//! # Pick channels
//! magneto channels --all
//! magneto channels toggle uuid-webtv-612
//!
//! # JSON output
//! magneto --format json --pretty recordings
//! ```

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use magneto_core::ActionResult;
use magneto_session::{AuthError, BoxContext};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{auth, channels, config, dashboard, recordings};
use output::JsonFormatter;

// ============================================================================
// CLI Definition
// ============================================================================

/// Magneto CLI - a local TV and PVR dashboard for Freebox routers.
#[derive(Parser)]
#[command(name = "magneto")]
#[command(about = "Local TV and PVR dashboard for Freebox routers")]
#[command(long_about = r#"
Magneto pairs with a Freebox on the local network and shows a chosen
subset of its TV channels together with scheduled recordings.

Pairing:
  magneto auth start --wait      # Request access, then press the button on the box
  magneto auth status            # Show the pairing state

Viewing:
  magneto                        # Selected channels and recordings
  magneto channels --all         # Every channel, with selection flags
  magneto channels toggle <ID>   # Select or deselect a channel
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run. If none, runs 'dashboard'.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Directory holding credentials, channel selection and config.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Pair with the box and manage the session.
    #[command(visible_alias = "a")]
    Auth(auth::AuthArgs),

    /// List or select channels.
    #[command(visible_alias = "c")]
    Channels(channels::ChannelsArgs),

    /// List scheduled recordings.
    #[command(visible_alias = "r")]
    Recordings,

    /// Show selected channels and recordings (default).
    #[command(visible_alias = "d")]
    Dashboard,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Loads the context from the configured data directory.
    pub async fn context(&self) -> Result<BoxContext> {
        Ok(BoxContext::load(self.data_dir.clone()).await?)
    }

    /// Returns true if text output should be colored.
    pub fn use_colors(&self) -> bool {
        !self.no_color
    }
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// No usable session with the box.
    NotAuthenticated = 2,
    /// The box could not be reached.
    Unreachable = 3,
    /// Approval timed out.
    Timeout = 4,
}

impl ExitCode {
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<AuthError>() {
            Some(AuthError::SessionUnavailable(_) | AuthError::InvalidState { .. }) => {
                ExitCode::NotAuthenticated
            }
            Some(AuthError::AuthorizationTimeout) => ExitCode::Timeout,
            Some(e) if e.is_transient() => ExitCode::Unreachable,
            _ => ExitCode::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("magneto=debug,info")
    } else {
        EnvFilter::new("magneto=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Auth(args)) => auth::run(args, &cli).await,
        Some(Commands::Channels(args)) => channels::run(args, &cli).await,
        Some(Commands::Recordings) => recordings::run(&cli).await,
        Some(Commands::Dashboard) | None => dashboard::run(&cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli).await,
    };

    if let Err(e) = result {
        report_error(&e, &cli);
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}

/// Reports a failed command as a structured result.
fn report_error(err: &anyhow::Error, cli: &Cli) {
    let result = match err.downcast_ref::<AuthError>() {
        Some(auth_err) => ActionResult::from(auth_err),
        None => ActionResult::failure(format!("{err:#}")),
    };

    match cli.format {
        OutputFormat::Json => match JsonFormatter::new(cli.pretty).format(&result) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error: {}", result.message),
        },
        OutputFormat::Text if !cli.quiet => eprintln!("Error: {}", result.message),
        OutputFormat::Text => {}
    }
}
