//! In-memory repository for testing
//!
//! Commits form a small DAG keyed by id; branches are names pointing at ids.

#![allow(dead_code)]

use async_trait::async_trait;
use revstack::error::{Error, Result};
use revstack::repo::Repository;
use revstack::types::CommitInfo;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

struct Commit {
    parents: Vec<String>,
    message: String,
}

/// Repository double with a push counter
pub struct MockRepository {
    root: PathBuf,
    current: String,
    default_branch: Option<String>,
    shallow: bool,
    fail_ancestry: bool,
    commits: HashMap<String, Commit>,
    refs: HashMap<String, String>,
    pushes: Mutex<Vec<String>>,
    fail_push: bool,
}

impl MockRepository {
    /// Empty repository with `current` checked out and `main` as default branch
    pub fn new(current: &str) -> Self {
        Self {
            root: PathBuf::from("/repo"),
            current: current.to_string(),
            default_branch: Some("main".to_string()),
            shallow: false,
            fail_ancestry: false,
            commits: HashMap::new(),
            refs: HashMap::new(),
            pushes: Mutex::new(Vec::new()),
            fail_push: false,
        }
    }

    /// Add a commit
    #[must_use]
    pub fn commit(mut self, id: &str, parents: &[&str], message: &str) -> Self {
        self.commits.insert(
            id.to_string(),
            Commit {
                parents: parents.iter().map(ToString::to_string).collect(),
                message: message.to_string(),
            },
        );
        self
    }

    /// Point a local branch and its `origin/` tracking ref at a commit
    #[must_use]
    pub fn branch(mut self, name: &str, id: &str) -> Self {
        self.refs.insert(name.to_string(), id.to_string());
        self.refs.insert(format!("origin/{name}"), id.to_string());
        self
    }

    /// Point only a local branch at a commit
    #[must_use]
    pub fn local_branch(mut self, name: &str, id: &str) -> Self {
        self.refs.insert(name.to_string(), id.to_string());
        self
    }

    /// Mark history as truncated
    #[must_use]
    pub const fn shallow(mut self) -> Self {
        self.shallow = true;
        self
    }

    /// Leave the remote HEAD unset, so the default branch is unknown
    #[must_use]
    pub fn without_default_branch(mut self) -> Self {
        self.default_branch = None;
        self
    }

    /// Make every ancestry query fail
    #[must_use]
    pub const fn failing_ancestry(mut self) -> Self {
        self.fail_ancestry = true;
        self
    }

    /// Make every push fail
    #[must_use]
    pub const fn failing_push(mut self) -> Self {
        self.fail_push = true;
        self
    }

    /// Branches pushed so far
    pub fn pushes(&self) -> Vec<String> {
        self.pushes.lock().unwrap().clone()
    }

    fn lookup(&self, rev: &str) -> Option<String> {
        self.refs.get(rev).cloned().or_else(|| {
            self.commits
                .contains_key(rev)
                .then(|| rev.to_string())
        })
    }

    /// `id` and everything reachable from it
    fn reachable(&self, id: &str) -> HashSet<String> {
        let mut seen = HashSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(next) = stack.pop() {
            if !seen.insert(next.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&next) {
                stack.extend(commit.parents.iter().cloned());
            }
        }
        seen
    }

    fn require(&self, rev: &str) -> Result<String> {
        self.lookup(rev)
            .ok_or_else(|| Error::Git(format!("unknown revision '{rev}'")))
    }
}

#[async_trait]
impl Repository for MockRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    fn remote(&self) -> &str {
        "origin"
    }

    async fn current_branch(&self) -> Result<String> {
        Ok(self.current.clone())
    }

    async fn default_branch(&self) -> Result<String> {
        self.default_branch.clone().ok_or_else(|| {
            Error::Git("ref refs/remotes/origin/HEAD is not a symbolic ref".to_string())
        })
    }

    async fn resolve(&self, rev: &str) -> Result<Option<String>> {
        Ok(self.lookup(rev))
    }

    async fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        if self.fail_ancestry {
            return Err(Error::Git("merge-base: bad object".to_string()));
        }
        let ancestor = self.require(ancestor)?;
        let descendant = self.require(descendant)?;
        Ok(self.reachable(&descendant).contains(&ancestor))
    }

    async fn commits_between(&self, base: &str, head: &str) -> Result<Vec<CommitInfo>> {
        let excluded = self.reachable(&self.require(base)?);
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![self.require(head)?];
        while let Some(id) = stack.pop() {
            if excluded.contains(&id) || !seen.insert(id.clone()) {
                continue;
            }
            let Some(commit) = self.commits.get(&id) else {
                continue;
            };
            out.push(CommitInfo {
                commit_id: id.clone(),
                author: "Dev".to_string(),
                message: commit.message.clone(),
                parent_count: commit.parents.len(),
            });
            // First parent last so it is visited next
            stack.extend(commit.parents.iter().rev().cloned());
        }
        Ok(out)
    }

    async fn remote_url(&self, remote: &str) -> Result<String> {
        if remote == "origin" {
            Ok("git@github.com:acme/widgets.git".to_string())
        } else {
            Err(Error::RemoteNotFound(remote.to_string()))
        }
    }

    async fn push(&self, branch: &str) -> Result<()> {
        if self.fail_push {
            return Err(Error::Git(format!("push of '{branch}' rejected")));
        }
        self.pushes.lock().unwrap().push(branch.to_string());
        Ok(())
    }

    async fn is_shallow(&self) -> Result<bool> {
        Ok(self.shallow)
    }
}
