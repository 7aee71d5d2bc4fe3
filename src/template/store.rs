//! Saved template documents
//!
//! Each save writes `<branch>-<unix-millis>.md`, with the branch name
//! reduced to filename-safe characters. The newest save for a branch is the
//! one `--continue` reopens.

use crate::error::Result;
use futures::stream::{self, StreamExt};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Files examined concurrently during discovery
const DISCOVERY_CONCURRENCY: usize = 8;

/// A saved document on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedDraft {
    /// File path
    pub path: PathBuf,
    /// Last modification time
    pub modified: SystemTime,
}

/// Directory of saved templates
#[derive(Debug, Clone)]
pub struct DraftStore {
    dir: PathBuf,
}

fn sanitize(branch: &str) -> String {
    branch
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

impl DraftStore {
    /// Store rooted at `dir`; the directory is created on first save
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn belongs_to(file_name: &str, prefix: &str) -> bool {
        file_name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(".md"))
            .is_some_and(|stamp| !stamp.is_empty() && stamp.chars().all(|c| c.is_ascii_digit()))
    }

    /// Save a document for `branch`, returning its path
    pub async fn save(&self, branch: &str, document: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());
        let path = self.dir.join(format!("{}-{millis}.md", sanitize(branch)));
        tokio::fs::write(&path, document).await?;
        debug!(path = %path.display(), "saved review template");
        Ok(path)
    }

    /// Saved documents for `branch`, newest first
    pub async fn list(&self, branch: &str) -> Result<Vec<SavedDraft>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}-", sanitize(branch));
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry
                .file_name()
                .to_str()
                .is_some_and(|name| Self::belongs_to(name, &prefix))
            {
                paths.push(entry.path());
            }
        }

        let results: Vec<std::io::Result<SavedDraft>> = stream::iter(paths)
            .map(|path| async move {
                let modified = tokio::fs::metadata(&path).await?.modified()?;
                Ok::<_, std::io::Error>(SavedDraft { path, modified })
            })
            .buffer_unordered(DISCOVERY_CONCURRENCY)
            .collect()
            .await;

        let mut drafts = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(draft) => drafts.push(draft),
                // Removed between listing and stat
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        // Completion order is arbitrary; the file name breaks mtime ties
        drafts.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.path.cmp(&a.path))
        });
        Ok(drafts)
    }

    /// Newest saved document for `branch`, with its contents
    pub async fn latest(&self, branch: &str) -> Result<Option<(SavedDraft, String)>> {
        let Some(draft) = self.list(branch).await?.into_iter().next() else {
            return Ok(None);
        };
        let content = tokio::fs::read_to_string(&draft.path).await?;
        Ok(Some((draft, content)))
    }

    /// Remove every saved document for `branch`
    pub async fn clear(&self, branch: &str) -> Result<usize> {
        let drafts = self.list(branch).await?;
        let mut removed = 0;
        for draft in &drafts {
            match tokio::fs::remove_file(&draft.path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if removed > 0 {
            debug!(branch, removed, "cleared saved review templates");
        }
        Ok(removed)
    }
}
