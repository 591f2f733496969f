//! Auth command - pair with the box and manage the session.

use anyhow::Result;
use clap::{Args, Subcommand};
use magneto_core::{ActionResult, AuthStatus};
use magneto_session::{BoxContext, PollOutcome, describe_status};
use tracing::info;

use crate::output::{AuthStartOutput, CredentialsOutput, JsonFormatter, SessionOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the auth command.
#[derive(Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub action: AuthAction,
}

/// Auth subcommands.
#[derive(Subcommand)]
pub enum AuthAction {
    /// Request an app token. The request must then be approved on the box.
    Start {
        /// Keep polling until the request is approved, denied or expired.
        #[arg(long)]
        wait: bool,
    },

    /// Check the pending request once.
    Poll,

    /// Open a session with an approved app token.
    Session,

    /// Show the pairing state.
    Status,

    /// Forget the session token.
    Logout,

    /// Point the client at another box.
    Url {
        /// Base URL of the box API, e.g. http://192.168.1.254/api/v4/
        url: String,
    },
}

/// Runs the auth command.
pub async fn run(args: &AuthArgs, cli: &Cli) -> Result<()> {
    let context = cli.context().await?;

    match &args.action {
        AuthAction::Start { wait } => start(&context, *wait, cli).await,
        AuthAction::Poll => {
            let outcome = context.auth().poll_status().await?;
            print_poll(&outcome, cli)
        }
        AuthAction::Session => session(&context, cli).await,
        AuthAction::Status => status(&context, cli).await,
        AuthAction::Logout => {
            context.auth().logout().await?;
            print_action(
                &ActionResult::ok("Logged out").with_status(AuthStatus::NotStarted),
                cli,
            )
        }
        AuthAction::Url { url } => {
            let stored = context.auth().set_api_base_url(url).await?;
            print_action(&ActionResult::ok(format!("API URL set to {stored}")), cli)
        }
    }
}

async fn start(context: &BoxContext, wait: bool, cli: &Cli) -> Result<()> {
    let track_id = context.auth().start_authentication().await?;
    info!(track_id, "Authorization requested");

    let output = AuthStartOutput {
        success: true,
        message: "Authorization requested. Approve it on the box.".to_string(),
        status: AuthStatus::WaitingApproval,
        track_id,
    };

    if !wait {
        return match cli.format {
            OutputFormat::Json => {
                println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
                Ok(())
            }
            OutputFormat::Text => {
                if !cli.quiet {
                    println!("{}", output.message);
                    println!("Then run `magneto auth poll` or `magneto auth start --wait`.");
                }
                Ok(())
            }
        };
    }

    if cli.format == OutputFormat::Text && !cli.quiet {
        println!("{}", output.message);
        println!("Waiting for approval...");
    }

    let outcome = context
        .auth()
        .wait_for_approval(context.config().poll_interval())
        .await?;
    print_poll(&outcome, cli)
}

async fn session(context: &BoxContext, cli: &Cli) -> Result<()> {
    let grant = context.auth().create_session().await?;
    let permissions: Vec<String> = grant
        .permissions
        .iter()
        .filter(|(_, granted)| **granted)
        .map(|(name, _)| name.clone())
        .collect();

    let output = SessionOutput {
        success: true,
        message: describe_status(AuthStatus::SessionCreated).to_string(),
        status: AuthStatus::SessionCreated,
        permissions,
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", output.message);
                if !output.permissions.is_empty() {
                    println!("Permissions: {}", output.permissions.join(", "));
                }
            }
        }
    }
    Ok(())
}

async fn status(context: &BoxContext, cli: &Cli) -> Result<()> {
    let record = context.auth().credentials().await;

    match cli.format {
        OutputFormat::Json => {
            let output = CredentialsOutput::from(&record);
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
        OutputFormat::Text => {
            let formatter = TextFormatter::new(cli.use_colors());
            println!("{}", formatter.format_credentials(&record));
            if !cli.quiet {
                println!();
                println!("{}", describe_status(record.auth_status));
            }
        }
    }
    Ok(())
}

fn print_poll(outcome: &PollOutcome, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(outcome)?);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                let formatter = TextFormatter::new(cli.use_colors());
                println!("{}", formatter.format_poll(outcome));
            }
        }
    }
    Ok(())
}

fn print_action(result: &ActionResult, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format(result)?);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                let formatter = TextFormatter::new(cli.use_colors());
                println!("{}", formatter.format_action(result));
            }
        }
    }
    Ok(())
}
