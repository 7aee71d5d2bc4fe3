//! Progress reporting for a submission
//!
//! [`Workflow`](super::Workflow) reports through [`ProgressCallback`] so the
//! same run can drive a terminal spinner or stay silent in tests.

use crate::error::Error;
use crate::types::ReviewRequest;
use async_trait::async_trait;
use std::fmt;

/// Submission phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Working out the base branch
    Detecting,
    /// Fetching review and check status of dependents
    Enriching,
    /// Reading commits
    Analyzing,
    /// Collecting review metadata
    Editing,
    /// Pushing the branch
    Pushing,
    /// Re-targeting an existing request
    UpdatingBase,
    /// Creating or updating the request
    Submitting,
    /// Requesting reviews
    RequestingReviewers,
    /// Submission complete
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Detecting => "Detecting base branch",
            Self::Enriching => "Checking dependent requests",
            Self::Analyzing => "Analyzing commits",
            Self::Editing => "Editing review metadata",
            Self::Pushing => "Pushing",
            Self::UpdatingBase => "Updating base branch",
            Self::Submitting => "Submitting",
            Self::RequestingReviewers => "Requesting reviewers",
            Self::Complete => "Done",
        })
    }
}

/// State of a branch push
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushStatus {
    Started,
    Success,
    /// Carries the git error output
    Failed(String),
}

/// Receiver for submission events
///
/// Every method is awaited inline, so implementations should return quickly.
#[async_trait]
pub trait ProgressCallback: Send + Sync {
    async fn on_phase(&self, phase: Phase);

    async fn on_push(&self, branch: &str, status: PushStatus);

    async fn on_created(&self, request: &ReviewRequest);

    async fn on_updated(&self, request: &ReviewRequest);

    /// A failure that did not stop the submission
    async fn on_error(&self, error: &Error);

    /// Free-form note, such as the rebase hint
    async fn on_message(&self, message: &str);
}

/// Discards every event
pub struct NoopProgress;

#[async_trait]
impl ProgressCallback for NoopProgress {
    async fn on_phase(&self, _phase: Phase) {}
    async fn on_push(&self, _branch: &str, _status: PushStatus) {}
    async fn on_created(&self, _request: &ReviewRequest) {}
    async fn on_updated(&self, _request: &ReviewRequest) {}
    async fn on_error(&self, _error: &Error) {}
    async fn on_message(&self, _message: &str) {}
}
