//! Mock platform service for testing
//!
//! These are test utilities - not all may be used in every test binary.

#![allow(dead_code)]

use async_trait::async_trait;
use revstack::error::{Error, Result};
use revstack::platform::PlatformService;
use revstack::types::{
    BranchRef, CheckRun, NewReviewRequest, PlatformConfig, RequestState, ReviewDecision,
    ReviewRequest, ReviewRequestUpdate, ReviewerSet,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// One recorded call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListOpen,
    FindExisting(String),
    Create(NewReviewRequest),
    Update(u64, ReviewRequestUpdate),
    RequestReviewers(u64, ReviewerSet),
    MarkReady(u64),
    ListReviews(u64),
    ListCheckRuns(String),
    ListRequestedReviewers(u64),
    CurrentUser,
}

impl Call {
    /// Operation name used for error injection
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::ListOpen => "list_open",
            Self::FindExisting(_) => "find_existing",
            Self::Create(_) => "create",
            Self::Update(..) => "update",
            Self::RequestReviewers(..) => "request_reviewers",
            Self::MarkReady(_) => "mark_ready",
            Self::ListReviews(_) => "list_reviews",
            Self::ListCheckRuns(_) => "list_check_runs",
            Self::ListRequestedReviewers(_) => "list_requested_reviewers",
            Self::CurrentUser => "current_user",
        }
    }
}

#[derive(Default)]
struct State {
    open: Vec<ReviewRequest>,
    reviews: HashMap<u64, Vec<ReviewDecision>>,
    check_runs: HashMap<String, Vec<CheckRun>>,
    requested: HashMap<u64, Vec<String>>,
    calls: Vec<Call>,
    // operation -> HTTP status returned on every call
    failures: HashMap<&'static str, u16>,
}

/// In-memory forge
///
/// Hand-written rather than generated so requests behave like a real forge:
/// creates show up in later listings and updates change stored requests.
/// Cloning shares state, so a test can keep a handle after boxing one copy
/// into a client.
///
/// Features:
/// - Auto-incrementing request numbers
/// - Call tracking for verification
/// - Error injection per operation
#[derive(Clone)]
pub struct MockPlatformService {
    config: PlatformConfig,
    user: String,
    next_number: Arc<AtomicU64>,
    state: Arc<Mutex<State>>,
}

impl MockPlatformService {
    /// Create a new mock with the given config
    pub fn with_config(config: PlatformConfig) -> Self {
        Self {
            config,
            user: "me".to_string(),
            next_number: Arc::new(AtomicU64::new(100)),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Add an open request
    pub fn add_open(&self, request: ReviewRequest) {
        self.state.lock().unwrap().open.push(request);
    }

    /// Set review decisions for a request
    pub fn set_reviews(&self, number: u64, reviews: Vec<ReviewDecision>) {
        self.state.lock().unwrap().reviews.insert(number, reviews);
    }

    /// Set check runs for a commit
    pub fn set_check_runs(&self, sha: &str, runs: Vec<CheckRun>) {
        self.state
            .lock()
            .unwrap()
            .check_runs
            .insert(sha.to_string(), runs);
    }

    /// Set requested reviewers for a request
    pub fn set_requested(&self, number: u64, reviewers: Vec<String>) {
        self.state
            .lock()
            .unwrap()
            .requested
            .insert(number, reviewers);
    }

    // === Error injection methods ===

    /// Make every call to `operation` fail with `status`
    pub fn fail(&self, operation: &'static str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, status);
    }

    // === Call verification methods ===

    /// All calls in order
    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Number of calls to `operation`
    pub fn count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// All `create` calls
    pub fn creates(&self) -> Vec<NewReviewRequest> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Create(new) => Some(new),
                _ => None,
            })
            .collect()
    }

    /// All `update` calls
    pub fn updates(&self) -> Vec<(u64, ReviewRequestUpdate)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(number, update) => Some((number, update)),
                _ => None,
            })
            .collect()
    }

    /// All `request_reviewers` calls
    pub fn reviewer_requests(&self) -> Vec<(u64, ReviewerSet)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::RequestReviewers(number, set) => Some((number, set)),
                _ => None,
            })
            .collect()
    }

    /// Stored request by number
    pub fn request(&self, number: u64) -> Option<ReviewRequest> {
        self.state
            .lock()
            .unwrap()
            .open
            .iter()
            .find(|r| r.number == number)
            .cloned()
    }

    /// Record a call and return the injected failure, if any
    fn record(&self, call: Call) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let status = state.failures.get(call.operation()).copied();
        state.calls.push(call);
        match status {
            Some(status) => Err(Error::from_status(status, "injected failure")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn list_open(&self) -> Result<Vec<ReviewRequest>> {
        self.record(Call::ListOpen)?;
        Ok(self.state.lock().unwrap().open.clone())
    }

    async fn find_existing(&self, head_branch: &str) -> Result<Option<ReviewRequest>> {
        self.record(Call::FindExisting(head_branch.to_string()))?;
        let state = self.state.lock().unwrap();
        Ok(state
            .open
            .iter()
            .find(|r| r.head.name == head_branch)
            .cloned())
    }

    async fn create(&self, new: &NewReviewRequest) -> Result<ReviewRequest> {
        self.record(Call::Create(new.clone()))?;

        let number = self.next_number.fetch_add(1, Ordering::SeqCst);
        let request = ReviewRequest {
            number,
            node_id: format!("node-{number}"),
            title: new.title.clone(),
            state: RequestState::Open,
            draft: new.draft,
            head: BranchRef::new(&new.head, format!("{}-tip", new.head)),
            base: BranchRef::new(&new.base, format!("{}-tip", new.base)),
            author: self.user.clone(),
            html_url: format!("https://github.com/acme/widgets/pull/{number}"),
            created_at: None,
            updated_at: None,
            reviews: None,
            check_runs: None,
            requested_reviewers: None,
        };
        self.state.lock().unwrap().open.push(request.clone());
        Ok(request)
    }

    async fn update(&self, number: u64, update: &ReviewRequestUpdate) -> Result<ReviewRequest> {
        self.record(Call::Update(number, update.clone()))?;

        let mut state = self.state.lock().unwrap();
        let request = state
            .open
            .iter_mut()
            .find(|r| r.number == number)
            .ok_or_else(|| Error::from_status(404, format!("request #{number} not found")))?;
        if let Some(base) = &update.base {
            request.base = BranchRef::new(base, format!("{base}-tip"));
        }
        if let Some(title) = &update.title {
            request.title.clone_from(title);
        }
        Ok(request.clone())
    }

    async fn request_reviewers(&self, number: u64, reviewers: &ReviewerSet) -> Result<()> {
        self.record(Call::RequestReviewers(number, reviewers.clone()))
    }

    async fn mark_ready(&self, request: &ReviewRequest) -> Result<()> {
        self.record(Call::MarkReady(request.number))?;
        let mut state = self.state.lock().unwrap();
        if let Some(stored) = state.open.iter_mut().find(|r| r.number == request.number) {
            stored.draft = false;
        }
        Ok(())
    }

    async fn list_reviews(&self, number: u64) -> Result<Vec<ReviewDecision>> {
        self.record(Call::ListReviews(number))?;
        let state = self.state.lock().unwrap();
        Ok(state.reviews.get(&number).cloned().unwrap_or_default())
    }

    async fn list_check_runs(&self, sha: &str) -> Result<Vec<CheckRun>> {
        self.record(Call::ListCheckRuns(sha.to_string()))?;
        let state = self.state.lock().unwrap();
        Ok(state.check_runs.get(sha).cloned().unwrap_or_default())
    }

    async fn list_requested_reviewers(&self, number: u64) -> Result<Vec<String>> {
        self.record(Call::ListRequestedReviewers(number))?;
        let state = self.state.lock().unwrap();
        Ok(state.requested.get(&number).cloned().unwrap_or_default())
    }

    async fn current_user(&self) -> Result<String> {
        self.record(Call::CurrentUser)?;
        Ok(self.user.clone())
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
