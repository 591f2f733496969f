//! Channels command - list and select channels.

use anyhow::Result;
use clap::{Args, Subcommand};
use magneto_session::BoxContext;

use crate::output::{JsonFormatter, TextFormatter, ToggleOutput};
use crate::{Cli, OutputFormat};

/// Arguments for the channels command.
#[derive(Args)]
pub struct ChannelsArgs {
    #[command(subcommand)]
    pub action: Option<ChannelsAction>,

    /// List every available channel instead of the selected ones.
    #[arg(long, short)]
    pub all: bool,
}

/// Channels subcommands.
#[derive(Subcommand)]
pub enum ChannelsAction {
    /// Select or deselect a channel.
    Toggle {
        /// Channel UUID, e.g. uuid-webtv-612.
        id: String,
    },

    /// Show a channel and its current program.
    Show {
        /// Channel UUID.
        id: String,
    },
}

/// Runs the channels command.
pub async fn run(args: &ChannelsArgs, cli: &Cli) -> Result<()> {
    let context = cli.context().await?;

    match &args.action {
        Some(ChannelsAction::Toggle { id }) => toggle(&context, id, cli).await,
        Some(ChannelsAction::Show { id }) => show(&context, id, cli).await,
        None => list(&context, args.all, cli).await,
    }
}

async fn list(context: &BoxContext, all: bool, cli: &Cli) -> Result<()> {
    let channels = if all {
        context.catalog().await?
    } else {
        context.channels().await?
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&channels)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(cli.use_colors());
            println!("{}", formatter.format_channels(&channels, all));
        }
    }
    Ok(())
}

async fn toggle(context: &BoxContext, id: &str, cli: &Cli) -> Result<()> {
    let selection = context.toggle_channel(id).await?;
    let output = ToggleOutput {
        success: true,
        channel_id: id.to_string(),
        selected: selection.contains(id),
        selection: selection.into_iter().collect(),
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                let verb = if output.selected { "Selected" } else { "Deselected" };
                println!("{verb} {id} ({} selected)", output.selection.len());
            }
        }
    }
    Ok(())
}

async fn show(context: &BoxContext, id: &str, cli: &Cli) -> Result<()> {
    let details = context.channel_details(id).await?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&details)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(cli.use_colors());
            println!("{}", formatter.format_channel_details(&details));
        }
    }
    Ok(())
}
