//! Shared command setup: repository, config and forge client

use revstack::cache::MemoryCache;
use revstack::client::{CircuitBreaker, ForgeClient};
use revstack::config::Config;
use revstack::error::Result;
use revstack::platform::{create_platform_service, parse_repo_info};
use revstack::repo::{GitRepository, Repository};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Everything a forge-backed command needs
pub struct CommandContext {
    pub repo: GitRepository,
    pub config: Config,
    pub client: ForgeClient,
}

impl CommandContext {
    /// Open the repository at `path` and connect to the forge behind its remote
    ///
    /// `remote` overrides the configured remote.
    pub async fn open(
        path: &Path,
        remote: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let repo = GitRepository::open(path, "origin").await?;
        let mut config = Config::load(repo.root())?;
        if let Some(remote) = remote {
            config.remote = remote.to_string();
        }
        let repo = repo.with_remote(config.remote.clone());

        let url = repo.remote_url(&config.remote).await?;
        let platform_config = parse_repo_info(&url)?;
        debug!(
            remote = %config.remote,
            platform = ?platform_config.platform,
            owner = %platform_config.owner,
            repo = %platform_config.repo,
            "resolved forge"
        );

        let platform = create_platform_service(&platform_config).await?;
        let breaker = Arc::new(CircuitBreaker::new(config.breaker_settings()));
        let client = ForgeClient::new(platform, breaker)
            .with_policy(config.retry_policy())
            .with_cache(Arc::new(MemoryCache::new()))
            .with_cancellation(cancel);

        Ok(Self {
            repo,
            config,
            client,
        })
    }
}
