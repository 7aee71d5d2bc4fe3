//! revstack - stacked review requests
//!
//! CLI binary for submitting git branches as stacked PRs/MRs.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use revstack::error::Error;
use revstack::types::Platform;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::style::Stylize;

#[derive(Parser)]
#[command(name = "revstack")]
#[command(about = "Stacked review requests - GitHub & GitLab")]
#[command(version)]
struct Cli {
    /// Path to git repository (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit the current branch as a review request
    Submit(SubmitArgs),

    /// List open requests based on a branch
    Deps {
        /// Branch to inspect (defaults to the current branch)
        branch: Option<String>,

        /// Git remote to inspect
        #[arg(long)]
        remote: Option<String>,
    },

    /// Authentication management
    Auth {
        #[command(subcommand)]
        platform: AuthPlatform,
    },
}

#[derive(Args)]
struct SubmitArgs {
    /// Open a new request as draft
    #[arg(long, conflicts_with = "ready")]
    draft: bool,

    /// Mark the request ready for review
    #[arg(long)]
    ready: bool,

    /// Edit metadata even when a request already exists
    #[arg(long, conflicts_with = "no_edit")]
    edit: bool,

    /// Validate the template without opening the editor
    #[arg(long)]
    no_edit: bool,

    /// Resume the last template that failed validation
    #[arg(long = "continue")]
    resume: bool,

    /// Base branch to target instead of detecting one
    #[arg(long)]
    base: Option<String>,

    /// Git remote to push to
    #[arg(long)]
    remote: Option<String>,
}

#[derive(Subcommand)]
enum AuthPlatform {
    /// GitHub authentication
    Github {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// GitLab authentication
    Gitlab {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum AuthAction {
    /// Test authentication
    Test,
    /// Show authentication setup instructions
    Setup,
}

impl From<AuthAction> for cli::AuthCommand {
    fn from(action: AuthAction) -> Self {
        match action {
            AuthAction::Test => Self::Test,
            AuthAction::Setup => Self::Setup,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("revstack=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match run(cli, cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if matches!(err.downcast_ref::<Error>(), Some(Error::Cancelled)) => {
            ExitCode::from(130)
        }
        Err(err) => {
            anstream::eprintln!("{}: {err:#}", "error".error());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let path = cli.path.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Submit(args) => {
            let options = revstack::submit::SubmitOptions {
                draft: args.draft,
                ready: args.ready,
                force_edit: args.edit,
                skip_editor: args.no_edit,
                continue_mode: args.resume,
                base_override: args.base,
            };
            cli::run_submit(&path, args.remote.as_deref(), &options, cancel).await?;
        }
        Commands::Deps { branch, remote } => {
            cli::run_deps(&path, branch.as_deref(), remote.as_deref(), cancel).await?;
        }
        Commands::Auth { platform } => match platform {
            AuthPlatform::Github { action } => {
                cli::run_auth(Platform::GitHub, action.into(), cancel).await?;
            }
            AuthPlatform::Gitlab { action } => {
                cli::run_auth(Platform::GitLab, action.into(), cancel).await?;
            }
        },
    }

    Ok(())
}
