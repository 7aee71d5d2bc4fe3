//! Commit analysis and reviewer suggestions
//!
//! Derives a suggested title and summary from the commits a branch adds on
//! top of its base.

use crate::error::Result;
use crate::repo::{Repository, remote_ref};
use crate::types::{CommitAnalysis, CommitInfo, ReviewRequest};

/// Analyze the commits `head` adds on top of `base`
///
/// Counts from the remote-tracking base when it exists locally, so commits
/// already pushed to the base are not included.
pub async fn analyze_commits(
    repo: &dyn Repository,
    base: &str,
    head: &str,
) -> Result<CommitAnalysis> {
    let tracking = remote_ref(repo, base);
    let base_rev = if repo.resolve(&tracking).await?.is_some() {
        tracking
    } else {
        base.to_string()
    };

    let commits = repo.commits_between(&base_rev, head).await?;
    Ok(analysis_from_commits(&commits, &base_rev, head))
}

/// Build an analysis from newest-first commits
pub fn analysis_from_commits(commits: &[CommitInfo], base: &str, head: &str) -> CommitAnalysis {
    let messages: Vec<String> = commits.iter().map(|c| c.message.clone()).collect();
    let has_merge_commits = commits.iter().any(CommitInfo::is_merge);

    let (title, summary) = match commits {
        [] => (
            title_from_branch(head),
            format!("No commits found between {base} and {head}."),
        ),
        [only] => (only.subject().to_string(), only.body()),
        _ => {
            let oldest_first: Vec<&CommitInfo> = commits.iter().rev().collect();
            let title = oldest_first[0].subject().to_string();
            let summary = oldest_first
                .iter()
                .map(|c| format!("- {}", c.subject()))
                .collect::<Vec<_>>()
                .join("\n");
            (title, summary)
        }
    };

    CommitAnalysis {
        title,
        summary,
        base_branch: base.to_string(),
        commit_count: commits.len(),
        messages,
        has_merge_commits,
    }
}

/// `feature/add-login` → `Add login`
fn title_from_branch(branch: &str) -> String {
    let last = branch.rsplit('/').next().unwrap_or(branch);
    let words = last.replace(['-', '_'], " ");
    let words = words.trim();
    let mut chars = words.chars();
    chars.next().map_or_else(
        || branch.to_string(),
        |first| first.to_uppercase().chain(chars).collect(),
    )
}

/// Reviewer handles to suggest in the template
///
/// Configured defaults first, then the parent's requested reviewers and
/// reviewers, de-duplicated case-insensitively and without `current_user`.
pub fn suggest_reviewers(
    defaults: &[String],
    parent: Option<&ReviewRequest>,
    current_user: Option<&str>,
) -> Vec<String> {
    let from_parent = parent.into_iter().flat_map(|p| {
        let requested = p.requested_reviewers.iter().flatten().cloned();
        let reviewed = p.reviews.iter().flatten().map(|r| r.reviewer.clone());
        requested.chain(reviewed)
    });

    let mut handles: Vec<String> = Vec::new();
    for raw in defaults.iter().cloned().chain(from_parent) {
        let name = raw.trim().trim_start_matches('@');
        if name.is_empty() {
            continue;
        }
        if current_user.is_some_and(|user| name.eq_ignore_ascii_case(user)) {
            continue;
        }
        let handle = format!("@{name}");
        if !handles.iter().any(|h| h.eq_ignore_ascii_case(&handle)) {
            handles.push(handle);
        }
    }
    handles
}
