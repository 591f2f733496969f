//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use magneto_core::ActionResult;
use magneto_store::MagnetoConfig;
use serde::Serialize;
use tracing::info;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show data file paths.
    Path,

    /// Write the default configuration and an empty credential record.
    Init {
        /// Overwrite an existing configuration file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Serialize)]
struct PathsOutput {
    data_dir: String,
    config: String,
    credentials: String,
    selection: String,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(cli).await,
        ConfigAction::Path => show_paths(cli).await,
        ConfigAction::Init { force } => init_config(*force, cli).await,
    }
}

async fn show_config(cli: &Cli) -> Result<()> {
    let context = cli.context().await?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(context.config())?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(cli.use_colors());
            println!("{}", formatter.format_config(context.config()));
        }
    }
    Ok(())
}

async fn show_paths(cli: &Cli) -> Result<()> {
    let context = cli.context().await?;
    let paths = PathsOutput {
        data_dir: context.data_dir().display().to_string(),
        config: context.config_path().display().to_string(),
        credentials: context.auth().store().path().display().to_string(),
        selection: context.selection().path().display().to_string(),
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&paths)?);
        }
        OutputFormat::Text => {
            println!("Data directory: {}", paths.data_dir);
            println!("Config:         {}", paths.config);
            println!("Credentials:    {}", paths.credentials);
            println!("Selection:      {}", paths.selection);
        }
    }
    Ok(())
}

async fn init_config(force: bool, cli: &Cli) -> Result<()> {
    let context = cli.context().await?;
    let path = context.config_path();

    let written = if path.exists() && !force {
        false
    } else {
        MagnetoConfig::default().save(&path).await?;
        info!(path = %path.display(), "Wrote default configuration");
        true
    };

    let message = if written {
        format!("Wrote default configuration to {}", path.display())
    } else {
        format!("Configuration already exists at {} (use --force to overwrite)", path.display())
    };

    match cli.format {
        OutputFormat::Json => {
            let result = ActionResult::ok(message);
            println!("{}", JsonFormatter::new(cli.pretty).format(&result)?);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{message}");
            }
        }
    }
    Ok(())
}
