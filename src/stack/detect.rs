//! Base branch detection

use crate::client::ForgeClient;
use crate::error::{Error, Result};
use crate::repo::{Repository, remote_ref};
use crate::types::{ReviewRequest, StackingContext};
use std::fmt;
use tracing::debug;

/// Which rule chose the base branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionRule {
    /// Base given on the command line
    Override,
    /// Nearest ancestor branch with an open review request
    Ancestry,
    /// Fell back to trunk
    Trunk,
}

impl fmt::Display for DetectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Override => "override",
            Self::Ancestry => "ancestry",
            Self::Trunk => "trunk",
        })
    }
}

/// Result of base detection
#[derive(Debug, Clone)]
pub struct BaseDetection {
    /// Chosen base and parent
    pub context: StackingContext,
    /// Rule that fired
    pub rule: DetectionRule,
    /// Human-readable reason
    pub explanation: String,
}

/// Decide which branch `current_branch` should target
///
/// An explicit override always wins. Otherwise the nearest ancestor branch
/// that has an open request and is not yet in trunk becomes the parent.
/// Failing that, the request targets trunk.
pub async fn detect_base(
    client: &ForgeClient,
    repo: &dyn Repository,
    current_branch: &str,
    trunk: &str,
    base_override: Option<&str>,
) -> Result<BaseDetection> {
    let open = client.list_open().await?;

    if let Some(base) = base_override {
        return Ok(match open.into_iter().find(|r| r.head.name == base) {
            Some(parent) => {
                let explanation = format!(
                    "base '{base}' given explicitly; it has open request #{}",
                    parent.number
                );
                BaseDetection {
                    context: StackingContext::stacked(current_branch, parent),
                    rule: DetectionRule::Override,
                    explanation,
                }
            }
            None => BaseDetection {
                context: StackingContext::unstacked(current_branch, base),
                rule: DetectionRule::Override,
                explanation: format!("base '{base}' given explicitly"),
            },
        });
    }

    let candidates: Vec<ReviewRequest> = open
        .into_iter()
        .filter(|r| r.head.name != current_branch && r.head.name != trunk)
        .collect();

    if let Some((parent, distance)) =
        nearest_ancestor(repo, current_branch, trunk, candidates).await?
    {
        let explanation = format!(
            "'{}' (#{}) is an ancestor {distance} commit(s) below '{current_branch}'",
            parent.head.name, parent.number
        );
        return Ok(BaseDetection {
            context: StackingContext::stacked(current_branch, parent),
            rule: DetectionRule::Ancestry,
            explanation,
        });
    }

    Ok(BaseDetection {
        context: StackingContext::unstacked(current_branch, trunk),
        rule: DetectionRule::Trunk,
        explanation: format!("no open request below '{current_branch}'; targeting '{trunk}'"),
    })
}

/// Reclassify a git failure hit while working out the base
pub(crate) fn detection_error(err: Error) -> Error {
    match err {
        Error::Git(message) => Error::Detection(message),
        other => other,
    }
}

/// Nearest candidate whose head is an ancestor of the current tip and not in trunk
async fn nearest_ancestor(
    repo: &dyn Repository,
    current_branch: &str,
    trunk: &str,
    candidates: Vec<ReviewRequest>,
) -> Result<Option<(ReviewRequest, usize)>> {
    if candidates.is_empty() {
        return Ok(None);
    }

    if repo.is_shallow().await.map_err(detection_error)? {
        return Err(Error::Detection(
            "repository is a shallow clone; run `git fetch --unshallow` or pass --base"
                .to_string(),
        ));
    }

    let tip = repo
        .resolve(current_branch)
        .await
        .map_err(detection_error)?
        .ok_or_else(|| Error::Detection(format!("branch '{current_branch}' not found")))?;

    let trunk_ref = remote_ref(repo, trunk);
    let trunk_tip = match repo.resolve(&trunk_ref).await.map_err(detection_error)? {
        Some(sha) => sha,
        None => repo
            .resolve(trunk)
            .await
            .map_err(detection_error)?
            .ok_or_else(|| {
                Error::Detection(format!("trunk '{trunk}' not found locally or as '{trunk_ref}'"))
            })?,
    };

    let mut best: Option<(ReviewRequest, usize)> = None;
    for candidate in candidates {
        let sha = candidate.head.sha.as_str();
        if sha.is_empty() || sha == tip {
            continue;
        }
        if repo.resolve(sha).await.map_err(detection_error)?.is_none() {
            debug!(
                branch = %candidate.head.name,
                sha,
                "candidate head not available locally, skipping"
            );
            continue;
        }
        if !repo.is_ancestor(sha, &tip).await.map_err(detection_error)? {
            continue;
        }
        if repo.is_ancestor(sha, &trunk_tip).await.map_err(detection_error)? {
            debug!(branch = %candidate.head.name, "candidate already in trunk, skipping");
            continue;
        }

        let distance = repo
            .commits_between(sha, &tip)
            .await
            .map_err(detection_error)?
            .len();
        debug!(branch = %candidate.head.name, distance, "ancestor candidate");
        // Strict comparison keeps the earlier entry in listing order on ties
        if best.as_ref().is_none_or(|(_, d)| distance < *d) {
            best = Some((candidate, distance));
        }
    }

    Ok(best)
}
