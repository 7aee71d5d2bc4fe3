//! Platform services for GitHub and GitLab
//!
//! Provides a unified interface for review-request operations across platforms.
//! Implementations perform single raw calls; retries, the circuit breaker and
//! caching live in [`crate::client::ForgeClient`].

mod detection;
mod factory;
mod github;
mod gitlab;

pub use detection::{detect_platform, parse_repo_info};
pub use factory::create_platform_service;
pub use github::GitHubService;
pub use gitlab::GitLabService;

use crate::error::Result;
use crate::types::{
    CheckRun, NewReviewRequest, PlatformConfig, ReviewDecision, ReviewRequest,
    ReviewRequestUpdate, ReviewerSet,
};
use async_trait::async_trait;

/// Raw forge operations on one repository
///
/// GitHub pull requests and GitLab merge requests both map onto
/// [`ReviewRequest`]. Errors carry the HTTP status so the client can classify
/// them.
#[async_trait]
pub trait PlatformService: Send + Sync {
    /// List open requests, most recently updated first
    async fn list_open(&self) -> Result<Vec<ReviewRequest>>;

    /// Find the open request for a head branch
    async fn find_existing(&self, head_branch: &str) -> Result<Option<ReviewRequest>>;

    /// Create a new request
    async fn create(&self, request: &NewReviewRequest) -> Result<ReviewRequest>;

    /// Patch base, title or body of an existing request
    async fn update(&self, number: u64, update: &ReviewRequestUpdate) -> Result<ReviewRequest>;

    /// Request reviews from users and teams
    async fn request_reviewers(&self, number: u64, reviewers: &ReviewerSet) -> Result<()>;

    /// Move a draft request to ready for review
    async fn mark_ready(&self, request: &ReviewRequest) -> Result<()>;

    /// Latest decision per reviewer
    async fn list_reviews(&self, number: u64) -> Result<Vec<ReviewDecision>>;

    /// Check runs reported for a commit
    async fn list_check_runs(&self, sha: &str) -> Result<Vec<CheckRun>>;

    /// Reviewers still requested on a request (`login` or `org/team`)
    async fn list_requested_reviewers(&self, number: u64) -> Result<Vec<String>>;

    /// Login of the authenticated user
    async fn current_user(&self) -> Result<String>;

    /// Forge, host and repository this service talks to
    fn config(&self) -> &PlatformConfig;
}
