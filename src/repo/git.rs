//! Repository backed by the `git` executable

use super::Repository;
use crate::error::{Error, Result};
use crate::types::CommitInfo;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// Git repository driven through the CLI
#[derive(Debug, Clone)]
pub struct GitRepository {
    root: PathBuf,
    remote: String,
}

impl GitRepository {
    /// Open the repository containing `path`
    pub async fn open(path: &Path, remote: impl Into<String>) -> Result<Self> {
        let output = Command::new("git")
            .arg("-C")
            .arg(path)
            .args(["rev-parse", "--show-toplevel"])
            .output()
            .await
            .map_err(|e| Error::Git(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            return Err(Error::Git(format!(
                "{} is not inside a git repository",
                path.display()
            )));
        }

        let root = PathBuf::from(String::from_utf8_lossy(&output.stdout).trim());
        debug!(root = %root.display(), "opened git repository");
        Ok(Self {
            root,
            remote: remote.into(),
        })
    }

    /// Same repository, different remote
    #[must_use]
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    async fn run(&self, args: &[&str]) -> Result<Output> {
        debug!(?args, "git");
        Command::new("git")
            .arg("-C")
            .arg(&self.root)
            .args(args)
            .env("LC_ALL", "C")
            .output()
            .await
            .map_err(|e| Error::Git(format!("failed to run git: {e}")))
    }

    /// Run git and return trimmed stdout, failing on a non-zero exit
    async fn git(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args).await?;
        if !output.status.success() {
            return Err(Error::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn ref_exists(&self, reference: &str) -> Result<bool> {
        let output = self
            .run(&["show-ref", "--verify", "--quiet", reference])
            .await?;
        Ok(output.status.success())
    }
}

#[async_trait]
impl Repository for GitRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn remote(&self) -> &str {
        &self.remote
    }

    async fn current_branch(&self) -> Result<String> {
        let output = self.run(&["symbolic-ref", "--quiet", "--short", "HEAD"]).await?;
        if !output.status.success() {
            return Err(Error::Git(
                "HEAD is detached; check out a branch first".to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn default_branch(&self) -> Result<String> {
        let head_ref = format!("refs/remotes/{}/HEAD", self.remote);
        let output = self
            .run(&["symbolic-ref", "--quiet", "--short", head_ref.as_str()])
            .await?;
        if output.status.success() {
            let short = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let prefix = format!("{}/", self.remote);
            return Ok(short
                .strip_prefix(&prefix)
                .unwrap_or(&short)
                .to_string());
        }

        for candidate in ["main", "master", "trunk"] {
            if self
                .ref_exists(&format!("refs/remotes/{}/{candidate}", self.remote))
                .await?
            {
                return Ok(candidate.to_string());
            }
        }

        Err(Error::Git(format!(
            "cannot determine the default branch of '{}'; set `trunk` in the config",
            self.remote
        )))
    }

    async fn resolve(&self, rev: &str) -> Result<Option<String>> {
        let spec = format!("{rev}^{{commit}}");
        let output = self
            .run(&["rev-parse", "--verify", "--quiet", spec.as_str()])
            .await?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }

    async fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let output = self
            .run(&["merge-base", "--is-ancestor", ancestor, descendant])
            .await?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(Error::Git(format!(
                "cannot compare {ancestor} and {descendant}: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }

    async fn commits_between(&self, base: &str, head: &str) -> Result<Vec<CommitInfo>> {
        let range = format!("{base}..{head}");
        let format = format!("--format=%H{FIELD_SEP}%an{FIELD_SEP}%P{FIELD_SEP}%B{RECORD_SEP}");
        let log = self.git(&["log", format.as_str(), range.as_str()]).await?;
        parse_log(&log)
    }

    async fn remote_url(&self, remote: &str) -> Result<String> {
        let output = self.run(&["remote", "get-url", remote]).await?;
        if !output.status.success() {
            return Err(Error::RemoteNotFound(remote.to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn push(&self, branch: &str) -> Result<()> {
        let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
        self.git(&["push", "--force-with-lease", self.remote.as_str(), refspec.as_str()])
            .await?;
        Ok(())
    }

    async fn is_shallow(&self) -> Result<bool> {
        Ok(self.git(&["rev-parse", "--is-shallow-repository"]).await? == "true")
    }
}

/// Parse `git log` output written with field and record separators
fn parse_log(log: &str) -> Result<Vec<CommitInfo>> {
    log.split(RECORD_SEP)
        .map(|record| record.trim_start_matches('\n'))
        .filter(|record| !record.trim().is_empty())
        .map(|record| {
            let mut fields = record.splitn(4, FIELD_SEP);
            let (Some(commit_id), Some(author), Some(parents), Some(message)) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                return Err(Error::Parse(format!("unexpected git log record: {record:?}")));
            };
            Ok(CommitInfo {
                commit_id: commit_id.to_string(),
                author: author.to_string(),
                message: message.trim_end().to_string(),
                parent_count: parents.split_whitespace().count(),
            })
        })
        .collect()
}
