//! Authentication for GitHub and GitLab
//!
//! Tokens come from the platform CLI (`gh`, `glab`) first, then from
//! environment variables.

use crate::error::{Error, Result};
use crate::types::Platform;
use std::env;
use tokio::process::Command;
use tracing::debug;

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// Token from CLI tool (gh or glab)
    Cli,
    /// Token from environment variable
    EnvVar,
}

/// Resolved credentials for one platform
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Authentication token
    pub token: String,
    /// Where the token was obtained from
    pub source: AuthSource,
    /// Host the token is valid for
    pub host: String,
}

struct Provider {
    cli: &'static str,
    env_vars: &'static [&'static str],
    default_host: &'static str,
    host_env: &'static str,
    login_hint: &'static str,
}

const fn provider(platform: Platform) -> Provider {
    match platform {
        Platform::GitHub => Provider {
            cli: "gh",
            env_vars: &["GITHUB_TOKEN", "GH_TOKEN"],
            default_host: "github.com",
            host_env: "GH_HOST",
            login_hint: "Run `gh auth login` or set GITHUB_TOKEN",
        },
        Platform::GitLab => Provider {
            cli: "glab",
            env_vars: &["GITLAB_TOKEN", "GL_TOKEN"],
            default_host: "gitlab.com",
            host_env: "GITLAB_HOST",
            login_hint: "Run `glab auth login` or set GITLAB_TOKEN",
        },
    }
}

/// Get authentication for a platform
///
/// Priority:
/// 1. platform CLI (`gh auth token` / `glab auth token`)
/// 2. environment variables, in order
pub async fn get_auth(platform: Platform, host: Option<&str>) -> Result<AuthConfig> {
    let provider = provider(platform);
    let host = host
        .map(String::from)
        .or_else(|| env::var(provider.host_env).ok())
        .unwrap_or_else(|| provider.default_host.to_string());

    if let Some(token) = cli_token(provider.cli, &host).await {
        debug!(cli = provider.cli, %host, "using CLI token");
        return Ok(AuthConfig {
            token,
            source: AuthSource::Cli,
            host,
        });
    }

    for var in provider.env_vars {
        if let Ok(token) = env::var(var)
            && !token.trim().is_empty()
        {
            debug!(var, "using token from environment");
            return Ok(AuthConfig {
                token: token.trim().to_string(),
                source: AuthSource::EnvVar,
                host,
            });
        }
    }

    Err(Error::Auth(format!(
        "no {platform:?} authentication found. {}",
        provider.login_hint
    )))
}

async fn cli_token(cli: &str, host: &str) -> Option<String> {
    let output = Command::new(cli)
        .args(["auth", "token", "--hostname", host])
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() { None } else { Some(token) }
}

/// Setup instructions for a platform
pub fn setup_instructions(platform: Platform) -> String {
    let provider = provider(platform);
    format!(
        "{hint}.\nTokens are read from `{cli} auth token` first, then from {vars}.\n\
         Self-hosted instances: set {host_env}.",
        hint = provider.login_hint,
        cli = provider.cli,
        vars = provider.env_vars.join(" / "),
        host_env = provider.host_env,
    )
}
