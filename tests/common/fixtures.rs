//! Test data factories for revstack types
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use super::mock_platform::MockPlatformService;
use revstack::cache::MemoryCache;
use revstack::client::{BreakerSettings, CircuitBreaker, ForgeClient, RetryPolicy};
use revstack::config::Config;
use revstack::types::{
    BranchRef, CheckConclusion, CheckRun, CheckRunStatus, Platform, PlatformConfig, RequestState,
    ReviewDecision, ReviewRequest, ReviewState,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// GitHub config for `acme/widgets`
pub fn github_config() -> PlatformConfig {
    PlatformConfig {
        platform: Platform::GitHub,
        owner: "acme".to_string(),
        repo: "widgets".to_string(),
        host: None,
    }
}

/// Open request with head and base commit ids
pub fn make_request(number: u64, head: &str, head_sha: &str, base: &str, base_sha: &str) -> ReviewRequest {
    ReviewRequest {
        number,
        node_id: format!("node-{number}"),
        title: format!("Work on {head}"),
        state: RequestState::Open,
        draft: false,
        head: BranchRef::new(head, head_sha),
        base: BranchRef::new(base, base_sha),
        author: "me".to_string(),
        html_url: format!("https://github.com/acme/widgets/pull/{number}"),
        created_at: None,
        updated_at: None,
        reviews: None,
        check_runs: None,
        requested_reviewers: None,
    }
}

/// Draft variant of [`make_request`]
pub fn make_draft(number: u64, head: &str, head_sha: &str, base: &str, base_sha: &str) -> ReviewRequest {
    ReviewRequest {
        draft: true,
        ..make_request(number, head, head_sha, base, base_sha)
    }
}

pub fn approved_by(reviewer: &str) -> ReviewDecision {
    ReviewDecision {
        reviewer: reviewer.to_string(),
        state: ReviewState::Approved,
    }
}

pub fn passing_check(name: &str) -> CheckRun {
    CheckRun {
        name: name.to_string(),
        status: CheckRunStatus::Completed,
        conclusion: Some(CheckConclusion::Success),
    }
}

/// Fast retries so failing paths finish quickly in real time
pub const fn quick_policy() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
        request_timeout: Duration::from_secs(5),
    }
}

/// Client over a mock forge with a fresh breaker and cache
pub fn make_client(mock: &MockPlatformService) -> ForgeClient {
    ForgeClient::new(
        Box::new(mock.clone()),
        Arc::new(CircuitBreaker::new(BreakerSettings::default())),
    )
    .with_policy(quick_policy())
    .with_cache(Arc::new(MemoryCache::new()))
}

/// Default config storing templates under `drafts`
pub fn make_config(drafts: &Path) -> Config {
    Config {
        drafts_dir: Some(drafts.to_path_buf()),
        ..Config::default()
    }
}
