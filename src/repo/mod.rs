//! Local repository access
//!
//! Stack detection and commit analysis only need a handful of read queries
//! plus a push, so the repository sits behind a narrow trait.

mod git;

pub use git::GitRepository;

use crate::error::Result;
use crate::types::CommitInfo;
use async_trait::async_trait;
use std::path::Path;

/// Read access to a local repository plus push
#[async_trait]
pub trait Repository: Send + Sync {
    /// Repository root
    fn root(&self) -> &Path;

    /// Remote used for pushes and trunk lookups
    fn remote(&self) -> &str;

    /// Name of the checked-out branch
    async fn current_branch(&self) -> Result<String>;

    /// Trunk branch of the remote (e.g. `main`)
    async fn default_branch(&self) -> Result<String>;

    /// Commit id for a revision, `None` when it does not exist locally
    async fn resolve(&self, rev: &str) -> Result<Option<String>>;

    /// Whether `ancestor` is reachable from `descendant`
    async fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    /// Commits reachable from `head` but not from `base`, newest first
    async fn commits_between(&self, base: &str, head: &str) -> Result<Vec<CommitInfo>>;

    /// URL of a remote
    async fn remote_url(&self, remote: &str) -> Result<String>;

    /// Push a branch to the remote
    async fn push(&self, branch: &str) -> Result<()>;

    /// Whether history is truncated
    async fn is_shallow(&self) -> Result<bool>;
}

/// `<remote>/<branch>`
pub fn remote_ref(repo: &dyn Repository, branch: &str) -> String {
    format!("{}/{branch}", repo.remote())
}
