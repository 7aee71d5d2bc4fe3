//! Dependent request tracking
//!
//! A dependent is an open request whose base is the branch being acted on.
//! Base changes come in two kinds that must not be confused: a rename (the
//! base branch name differs) needs a forge-side update, while a rebase (same
//! name, new tip) does not, since the forge follows branch names.

use crate::client::ForgeClient;
use crate::error::Result;
use crate::repo::{Repository, remote_ref};
use crate::types::{ReviewRequest, ReviewRequestUpdate};
use tracing::{debug, info};

/// Open requests targeting `branch`, in listing order
pub fn filter_dependents(open: &[ReviewRequest], branch: &str) -> Vec<ReviewRequest> {
    open.iter()
        .filter(|r| r.is_open() && r.base.name == branch)
        .cloned()
        .collect()
}

/// Open requests targeting `branch`, and whether there are any
pub async fn find_dependents(
    client: &ForgeClient,
    branch: &str,
) -> Result<(Vec<ReviewRequest>, bool)> {
    let open = client.list_open().await?;
    let dependents = filter_dependents(&open, branch);
    debug!(branch, count = dependents.len(), "found dependents");
    let any = !dependents.is_empty();
    Ok((dependents, any))
}

/// Whether the request's base name differs from the detected base
pub fn detect_base_changed(existing: &ReviewRequest, detected_base: &str) -> bool {
    existing.base.name != detected_base
}

/// Whether the request's recorded base commit differs from that branch's current tip
pub fn detect_rebase(existing: &ReviewRequest, current_base_sha: &str) -> bool {
    !existing.base.sha.is_empty()
        && !current_base_sha.is_empty()
        && existing.base.sha != current_base_sha
}

/// How an existing request's base compares with the detected base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseCheck {
    /// Base branch name differs and needs re-targeting
    pub base_changed: bool,
    /// Base branch was rewritten under the same name
    pub rebase_detected: bool,
}

/// Compare `existing` with `detected_base` without touching the forge
///
/// A renamed base is never also reported as a rebase.
pub async fn check_stacked_base(
    repo: &dyn Repository,
    existing: &ReviewRequest,
    detected_base: &str,
) -> Result<BaseCheck> {
    if detect_base_changed(existing, detected_base) {
        return Ok(BaseCheck {
            base_changed: true,
            rebase_detected: false,
        });
    }

    let base = &existing.base.name;
    let current_sha = match repo.resolve(&remote_ref(repo, base)).await? {
        Some(sha) => Some(sha),
        None => repo.resolve(base).await?,
    };
    let rebase_detected = match current_sha {
        Some(sha) => detect_rebase(existing, &sha),
        None => {
            debug!(base = %base, "base branch not found locally, skipping rebase check");
            false
        }
    };
    if rebase_detected {
        debug!(number = existing.number, base = %base, "base branch was rebased");
    }

    Ok(BaseCheck {
        base_changed: false,
        rebase_detected,
    })
}

/// What [`handle_stacked_update`] did
#[derive(Debug, Clone)]
pub struct StackedUpdate {
    /// Request after any update
    pub request: ReviewRequest,
    /// Base was re-targeted on the forge
    pub base_updated: bool,
    /// Base branch was rewritten under the same name
    pub rebase_detected: bool,
    /// Base before re-targeting
    pub previous_base: Option<String>,
}

/// Re-target the request if its base was renamed, and note rebases
pub async fn handle_stacked_update(
    client: &ForgeClient,
    repo: &dyn Repository,
    existing: &ReviewRequest,
    detected_base: &str,
) -> Result<StackedUpdate> {
    let check = check_stacked_base(repo, existing, detected_base).await?;
    if !check.base_changed {
        return Ok(StackedUpdate {
            request: existing.clone(),
            base_updated: false,
            rebase_detected: check.rebase_detected,
            previous_base: None,
        });
    }

    info!(
        number = existing.number,
        from = %existing.base.name,
        to = detected_base,
        "updating base branch"
    );
    let request = client
        .update(existing.number, &ReviewRequestUpdate::base(detected_base))
        .await?;
    Ok(StackedUpdate {
        request,
        base_updated: true,
        rebase_detected: false,
        previous_base: Some(existing.base.name.clone()),
    })
}
