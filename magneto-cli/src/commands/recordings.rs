//! Recordings command - list scheduled recordings.

use anyhow::Result;

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Runs the recordings command.
pub async fn run(cli: &Cli) -> Result<()> {
    let context = cli.context().await?;
    let recordings = context.recordings().await?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&recordings)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(cli.use_colors());
            println!("{}", formatter.format_recordings(&recordings));
        }
    }
    Ok(())
}
