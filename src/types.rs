//! Core types for revstack

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A branch reference as recorded on the forge
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BranchRef {
    /// Branch name
    pub name: String,
    /// Commit ID (hex) the forge last saw for this branch
    pub sha: String,
}

impl BranchRef {
    /// Create a branch reference
    pub fn new(name: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sha: sha.into(),
        }
    }
}

/// Lifecycle state of a review request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Open for review
    Open,
    /// Closed or merged
    Closed,
}

/// A pull request / merge request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// PR/MR number
    pub number: u64,
    /// Opaque global id (GraphQL node id on GitHub)
    pub node_id: String,
    /// Title
    pub title: String,
    /// Lifecycle state
    pub state: RequestState,
    /// Whether the request is a draft
    pub draft: bool,
    /// Head branch
    pub head: BranchRef,
    /// Base branch
    pub base: BranchRef,
    /// Author login
    pub author: String,
    /// Web URL for the PR/MR
    pub html_url: String,
    /// Creation time
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time
    pub updated_at: Option<DateTime<Utc>>,
    /// Reviewer decisions, `None` until enriched
    pub reviews: Option<Vec<ReviewDecision>>,
    /// CI check runs on the head commit, `None` until enriched
    pub check_runs: Option<Vec<CheckRun>>,
    /// Requested reviewer handles, `None` until enriched
    pub requested_reviewers: Option<Vec<String>>,
}

impl ReviewRequest {
    /// Whether the request is open
    pub fn is_open(&self) -> bool {
        self.state == RequestState::Open
    }

    /// Whether enrichment data has been attached
    pub const fn is_enriched(&self) -> bool {
        self.reviews.is_some() && self.check_runs.is_some() && self.requested_reviewers.is_some()
    }

    /// Aggregated review status over enriched decisions
    pub fn review_status(&self) -> ReviewStatus {
        ReviewStatus::aggregate(self.reviews.as_deref().unwrap_or_default())
    }

    /// Aggregated check status over enriched runs
    pub fn check_status(&self) -> CheckStatus {
        CheckStatus::aggregate(self.check_runs.as_deref().unwrap_or_default())
    }
}

/// State of one reviewer's review
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Approved
    Approved,
    /// Changes requested
    ChangesRequested,
    /// Commented without a verdict
    Commented,
    /// Review started but not submitted
    Pending,
}

/// One reviewer's decision on a review request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReviewDecision {
    /// Reviewer login
    pub reviewer: String,
    /// Decision
    pub state: ReviewState,
}

/// Aggregated review status for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    /// At least one reviewer requested changes
    ChangesRequested,
    /// Approved
    Approved,
    /// Only comments so far
    Commented,
    /// Reviews pending
    Pending,
    /// No reviews yet
    ReviewRequired,
}

impl ReviewStatus {
    /// Precedence rank, higher wins
    const fn rank(self) -> u8 {
        match self {
            Self::ChangesRequested => 4,
            Self::Approved => 3,
            Self::Commented => 2,
            Self::Pending => 1,
            Self::ReviewRequired => 0,
        }
    }

    /// Aggregate per-reviewer decisions into one status
    pub fn aggregate(decisions: &[ReviewDecision]) -> Self {
        decisions
            .iter()
            .map(|d| Self::from(d.state))
            .max_by_key(|s| s.rank())
            .unwrap_or(Self::ReviewRequired)
    }
}

impl From<ReviewState> for ReviewStatus {
    fn from(state: ReviewState) -> Self {
        match state {
            ReviewState::Approved => Self::Approved,
            ReviewState::ChangesRequested => Self::ChangesRequested,
            ReviewState::Commented => Self::Commented,
            ReviewState::Pending => Self::Pending,
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ChangesRequested => "changes requested",
            Self::Approved => "approved",
            Self::Commented => "commented",
            Self::Pending => "review pending",
            Self::ReviewRequired => "review required",
        };
        f.write_str(s)
    }
}

/// Execution status of a check run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunStatus {
    /// Waiting to start
    Queued,
    /// Running
    InProgress,
    /// Finished; see conclusion
    Completed,
}

/// Conclusion of a completed check run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckConclusion {
    /// Passed
    Success,
    /// Failed
    Failure,
    /// Neutral result
    Neutral,
    /// Cancelled before finishing
    Cancelled,
    /// Skipped
    Skipped,
    /// Exceeded its time limit
    TimedOut,
    /// Needs manual action
    ActionRequired,
}

/// A CI check run on a commit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckRun {
    /// Check name
    pub name: String,
    /// Execution status
    pub status: CheckRunStatus,
    /// Conclusion once completed
    pub conclusion: Option<CheckConclusion>,
}

/// Aggregated CI status for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    /// At least one check failed
    Failure,
    /// Checks still running
    InProgress,
    /// All checks passed
    Success,
    /// Only neutral or skipped checks
    Neutral,
    /// No checks reported
    NoChecks,
}

impl CheckStatus {
    const fn rank(self) -> u8 {
        match self {
            Self::Failure => 4,
            Self::InProgress => 3,
            Self::Success => 2,
            Self::Neutral => 1,
            Self::NoChecks => 0,
        }
    }

    /// Bucket for a single run
    pub const fn of_run(run: &CheckRun) -> Self {
        match (run.status, run.conclusion) {
            (CheckRunStatus::Completed, Some(conclusion)) => match conclusion {
                CheckConclusion::Success => Self::Success,
                CheckConclusion::Neutral | CheckConclusion::Skipped => Self::Neutral,
                CheckConclusion::Failure
                | CheckConclusion::Cancelled
                | CheckConclusion::TimedOut
                | CheckConclusion::ActionRequired => Self::Failure,
            },
            (CheckRunStatus::Completed, None) => Self::Neutral,
            (CheckRunStatus::Queued | CheckRunStatus::InProgress, _) => Self::InProgress,
        }
    }

    /// Aggregate runs into one status
    pub fn aggregate(runs: &[CheckRun]) -> Self {
        runs.iter()
            .map(Self::of_run)
            .max_by_key(|s| s.rank())
            .unwrap_or(Self::NoChecks)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Failure => "checks failing",
            Self::InProgress => "checks running",
            Self::Success => "checks passing",
            Self::Neutral => "checks neutral",
            Self::NoChecks => "no checks",
        };
        f.write_str(s)
    }
}

/// Where a stacked branch should point, with its neighbours
#[derive(Debug, Clone)]
pub struct StackingContext {
    /// Whether the branch stacks on another open request
    pub is_stacking: bool,
    /// Chosen base branch name
    pub base_branch: String,
    /// Parent request; set iff `is_stacking`
    pub parent: Option<ReviewRequest>,
    /// Open requests whose base is the current branch
    pub dependents: Vec<ReviewRequest>,
    /// Current branch name
    pub current_branch: String,
    /// Whether dependents should be surfaced to the user
    pub show_dependents: bool,
}

impl StackingContext {
    /// Context that stacks on `parent`
    pub fn stacked(current_branch: &str, parent: ReviewRequest) -> Self {
        Self {
            is_stacking: true,
            base_branch: parent.head.name.clone(),
            parent: Some(parent),
            dependents: Vec::new(),
            current_branch: current_branch.to_string(),
            show_dependents: false,
        }
    }

    /// Context that targets `base` directly
    pub fn unstacked(current_branch: &str, base: &str) -> Self {
        Self {
            is_stacking: false,
            base_branch: base.to_string(),
            parent: None,
            dependents: Vec::new(),
            current_branch: current_branch.to_string(),
            show_dependents: false,
        }
    }

    /// Attach dependents, surfacing them when any exist
    pub fn with_dependents(mut self, dependents: Vec<ReviewRequest>) -> Self {
        self.show_dependents = !dependents.is_empty();
        self.dependents = dependents;
        self
    }
}

/// A commit between two refs, as reported by the local repository
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitInfo {
    /// Git commit ID (hex)
    pub commit_id: String,
    /// Author name
    pub author: String,
    /// Full commit message
    pub message: String,
    /// Number of parents
    pub parent_count: usize,
}

impl CommitInfo {
    /// First line of the message
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or_default().trim()
    }

    /// Message after the subject and blank separator
    pub fn body(&self) -> String {
        self.message
            .lines()
            .skip(1)
            .skip_while(|l| l.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n")
            .trim_end()
            .to_string()
    }

    /// Whether this is a merge commit
    pub const fn is_merge(&self) -> bool {
        self.parent_count > 1
    }
}

/// Suggested review metadata derived from the commits on a branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAnalysis {
    /// Suggested title
    pub title: String,
    /// Suggested summary body
    pub summary: String,
    /// Base branch the commits were counted from
    pub base_branch: String,
    /// Number of commits
    pub commit_count: usize,
    /// Raw commit messages (newest first)
    pub messages: Vec<String>,
    /// Whether any commit is a merge
    pub has_merge_commits: bool,
}

/// Reviewer handles split into users and teams
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewerSet {
    /// User logins (without `@`)
    pub users: Vec<String>,
    /// Team slugs (without `@org/`)
    pub teams: Vec<String>,
}

impl ReviewerSet {
    /// Whether there is no one to request
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.teams.is_empty()
    }

    /// Drop a user, comparing case-insensitively
    pub fn without_user(mut self, login: &str) -> Self {
        self.users.retain(|u| !u.eq_ignore_ascii_case(login));
        self
    }
}

/// Fields for creating a review request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReviewRequest {
    /// Head branch
    pub head: String,
    /// Base branch
    pub base: String,
    /// Title
    pub title: String,
    /// Description body
    pub body: String,
    /// Open as draft
    pub draft: bool,
}

/// Fields to patch on an existing review request; `None` leaves a field alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewRequestUpdate {
    /// New base branch
    pub base: Option<String>,
    /// New title
    pub title: Option<String>,
    /// New description body
    pub body: Option<String>,
}

impl ReviewRequestUpdate {
    /// Patch only the base branch
    pub fn base(base: impl Into<String>) -> Self {
        Self {
            base: Some(base.into()),
            ..Self::default()
        }
    }
}

/// A git remote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRemote {
    /// Remote name (e.g., "origin")
    pub name: String,
    /// Remote URL
    pub url: String,
}

/// Detected platform type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    /// GitHub or GitHub Enterprise
    GitHub,
    /// GitLab or self-hosted GitLab
    GitLab,
}

/// Platform configuration
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Platform type
    pub platform: Platform,
    /// Repository owner (user or organization)
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Custom host (None for github.com/gitlab.com)
    pub host: Option<String>,
}
