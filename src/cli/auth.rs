//! Auth command - test and explain authentication

use crate::cli::style::{Stylize, check};
use anstream::println;
use revstack::auth::{AuthSource, get_auth, setup_instructions};
use revstack::client::{BreakerSettings, CircuitBreaker, ForgeClient};
use revstack::error::Result;
use revstack::platform::create_platform_service;
use revstack::types::{Platform, PlatformConfig};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Auth subcommand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCommand {
    /// Resolve a token and look up the authenticated user
    Test,
    /// Print setup instructions
    Setup,
}

const fn platform_name(platform: Platform) -> &'static str {
    match platform {
        Platform::GitHub => "GitHub",
        Platform::GitLab => "GitLab",
    }
}

/// Run the auth test command
async fn run_auth_test(platform: Platform, cancel: CancellationToken) -> Result<()> {
    println!("Testing {} authentication...", platform_name(platform));
    let auth = get_auth(platform, None).await?;

    // Owner and repo are unused by the current-user lookup
    let config = PlatformConfig {
        platform,
        owner: String::new(),
        repo: String::new(),
        host: (!matches!(auth.host.as_str(), "github.com" | "gitlab.com"))
            .then(|| auth.host.clone()),
    };
    let service = create_platform_service(&config).await?;
    let client = ForgeClient::new(
        service,
        Arc::new(CircuitBreaker::new(BreakerSettings::default())),
    )
    .with_cancellation(cancel);
    let login = client.current_user().await?;

    let source = match auth.source {
        AuthSource::Cli => "platform CLI",
        AuthSource::EnvVar => "environment variable",
    };
    println!("{} Authenticated as {}", check(), login.accent());
    println!("  {} {source}", "token source:".muted());
    println!("  {} {}", "host:".muted(), auth.host);
    Ok(())
}

/// Run the auth setup command (show instructions)
fn run_auth_setup(platform: Platform) {
    let title = format!("{} Authentication Setup", platform_name(platform));
    println!("{}", title.emphasis());
    println!();
    println!("{}", setup_instructions(platform));
}

/// Dispatch an auth subcommand
pub async fn run_auth(
    platform: Platform,
    command: AuthCommand,
    cancel: CancellationToken,
) -> Result<()> {
    match command {
        AuthCommand::Test => run_auth_test(platform, cancel).await,
        AuthCommand::Setup => {
            run_auth_setup(platform);
            Ok(())
        }
    }
}
