//! Dashboard command - selected channels and recordings (default command).

use anyhow::Result;
use magneto_core::AuthStatus;
use magneto_session::describe_status;
use tracing::debug;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the dashboard command.
pub async fn run(cli: &Cli) -> Result<()> {
    let context = cli.context().await?;

    let status = context.auth().credentials().await.auth_status;
    if status != AuthStatus::SessionCreated {
        debug!(status = %status, "No session yet");
        if cli.format == OutputFormat::Text && !cli.quiet {
            println!("{}", describe_status(status));
            println!("Run `magneto auth start --wait` to pair with the box.");
            return Ok(());
        }
    }

    let dashboard = context.dashboard().await?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&dashboard)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(cli.use_colors());
            println!("{}", formatter.format_dashboard(&dashboard));
        }
    }
    Ok(())
}
