//! GitHub platform service implementation

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{
    BranchRef, CheckConclusion, CheckRun, CheckRunStatus, NewReviewRequest, Platform,
    PlatformConfig, RequestState, ReviewDecision, ReviewRequest, ReviewRequestUpdate,
    ReviewState, ReviewerSet,
};
use async_trait::async_trait;
use octocrab::Octocrab;
use octocrab::models::IssueState;
use octocrab::params::{Direction, State, pulls::Sort};
use serde::Deserialize;
use serde_json::json;

/// GitHub service using octocrab
pub struct GitHubService {
    client: Octocrab,
    config: PlatformConfig,
}

#[derive(Deserialize)]
struct Login {
    login: String,
}

#[derive(Deserialize)]
struct ReviewPayload {
    user: Option<Login>,
    state: String,
}

#[derive(Deserialize)]
struct CheckRunPayload {
    name: String,
    status: String,
    conclusion: Option<String>,
}

#[derive(Deserialize)]
struct CheckRunsPage {
    check_runs: Vec<CheckRunPayload>,
}

#[derive(Deserialize)]
struct TeamSlug {
    slug: String,
}

#[derive(Deserialize)]
struct RequestedReviewersPayload {
    users: Vec<Login>,
    teams: Vec<TeamSlug>,
}

const MARK_READY_MUTATION: &str = "mutation($id: ID!) { \
    markPullRequestReadyForReview(input: {pullRequestId: $id}) { pullRequest { isDraft } } }";

impl GitHubService {
    /// Create a new GitHub service
    pub fn new(token: &str, owner: String, repo: String, host: Option<String>) -> Result<Self> {
        let mut builder = Octocrab::builder().personal_token(token.to_string());

        if let Some(ref h) = host {
            let base_url = format!("https://{h}/api/v3");
            builder = builder
                .base_uri(&base_url)
                .map_err(|e| Error::Config(e.to_string()))?;
        }

        let client = builder.build().map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            client,
            config: PlatformConfig {
                platform: Platform::GitHub,
                owner,
                repo,
                host,
            },
        })
    }

    fn repo_path(&self, rest: &str) -> String {
        format!("/repos/{}/{}{rest}", self.config.owner, self.config.repo)
    }
}

fn to_review_request(pr: &octocrab::models::pulls::PullRequest) -> ReviewRequest {
    ReviewRequest {
        number: pr.number,
        node_id: pr.node_id.clone().unwrap_or_default(),
        title: pr.title.as_deref().unwrap_or_default().to_string(),
        state: if matches!(pr.state, Some(IssueState::Open)) {
            RequestState::Open
        } else {
            RequestState::Closed
        },
        draft: pr.draft.unwrap_or(false),
        head: BranchRef::new(pr.head.ref_field.clone(), pr.head.sha.clone()),
        base: BranchRef::new(pr.base.ref_field.clone(), pr.base.sha.clone()),
        author: pr
            .user
            .as_ref()
            .map(|u| u.login.clone())
            .unwrap_or_default(),
        html_url: pr
            .html_url
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default(),
        created_at: pr.created_at,
        updated_at: pr.updated_at,
        reviews: None,
        check_runs: None,
        requested_reviewers: None,
    }
}

/// Collapse a review history to the latest verdict per reviewer
///
/// A later comment does not override an earlier approval or change request.
fn latest_decisions(reviews: Vec<ReviewPayload>) -> Vec<ReviewDecision> {
    let mut decisions: Vec<ReviewDecision> = Vec::new();
    for review in reviews {
        let Some(user) = review.user else { continue };
        let state = match review.state.as_str() {
            "APPROVED" => ReviewState::Approved,
            "CHANGES_REQUESTED" => ReviewState::ChangesRequested,
            "COMMENTED" => ReviewState::Commented,
            "PENDING" => ReviewState::Pending,
            // DISMISSED and unknown states clear nothing and add nothing
            _ => continue,
        };

        match decisions.iter_mut().find(|d| d.reviewer == user.login) {
            Some(existing) => {
                let keeps_verdict = state == ReviewState::Commented
                    && matches!(
                        existing.state,
                        ReviewState::Approved | ReviewState::ChangesRequested
                    );
                if !keeps_verdict {
                    existing.state = state;
                }
            }
            None => decisions.push(ReviewDecision {
                reviewer: user.login,
                state,
            }),
        }
    }
    decisions
}

fn to_check_run(payload: CheckRunPayload) -> CheckRun {
    let status = match payload.status.as_str() {
        "completed" => CheckRunStatus::Completed,
        "in_progress" => CheckRunStatus::InProgress,
        _ => CheckRunStatus::Queued,
    };
    let conclusion = payload.conclusion.as_deref().map(|c| match c {
        "success" => CheckConclusion::Success,
        "failure" => CheckConclusion::Failure,
        "cancelled" => CheckConclusion::Cancelled,
        "skipped" => CheckConclusion::Skipped,
        "timed_out" => CheckConclusion::TimedOut,
        "action_required" => CheckConclusion::ActionRequired,
        _ => CheckConclusion::Neutral,
    });
    CheckRun {
        name: payload.name,
        status,
        conclusion,
    }
}

#[async_trait]
impl PlatformService for GitHubService {
    async fn list_open(&self) -> Result<Vec<ReviewRequest>> {
        let page = self
            .client
            .pulls(&self.config.owner, &self.config.repo)
            .list()
            .state(State::Open)
            .sort(Sort::Updated)
            .direction(Direction::Descending)
            .per_page(100)
            .send()
            .await?;

        let prs = self.client.all_pages(page).await?;
        Ok(prs.iter().map(to_review_request).collect())
    }

    async fn find_existing(&self, head_branch: &str) -> Result<Option<ReviewRequest>> {
        let head = format!("{}:{}", &self.config.owner, head_branch);

        let prs = self
            .client
            .pulls(&self.config.owner, &self.config.repo)
            .list()
            .head(head)
            .state(State::Open)
            .send()
            .await?;

        Ok(prs.items.first().map(to_review_request))
    }

    async fn create(&self, request: &NewReviewRequest) -> Result<ReviewRequest> {
        let pr = self
            .client
            .pulls(&self.config.owner, &self.config.repo)
            .create(&request.title, &request.head, &request.base)
            .body(&request.body)
            .draft(request.draft)
            .send()
            .await?;

        Ok(to_review_request(&pr))
    }

    async fn update(&self, number: u64, update: &ReviewRequestUpdate) -> Result<ReviewRequest> {
        let pulls = self.client.pulls(&self.config.owner, &self.config.repo);
        let mut builder = pulls.update(number);
        if let Some(base) = &update.base {
            builder = builder.base(base);
        }
        if let Some(title) = &update.title {
            builder = builder.title(title);
        }
        if let Some(body) = &update.body {
            builder = builder.body(body);
        }

        let pr = builder.send().await?;
        Ok(to_review_request(&pr))
    }

    async fn request_reviewers(&self, number: u64, reviewers: &ReviewerSet) -> Result<()> {
        let route = self.repo_path(&format!("/pulls/{number}/requested_reviewers"));
        let body = json!({
            "reviewers": reviewers.users,
            "team_reviewers": reviewers.teams,
        });

        let _: serde_json::Value = self.client.post(route, Some(&body)).await?;
        Ok(())
    }

    async fn mark_ready(&self, request: &ReviewRequest) -> Result<()> {
        let payload = json!({
            "query": MARK_READY_MUTATION,
            "variables": { "id": request.node_id },
        });

        let response: serde_json::Value = self.client.graphql(&payload).await?;
        if let Some(errors) = response.get("errors") {
            return Err(Error::from_status(422, errors.to_string()));
        }
        Ok(())
    }

    async fn list_reviews(&self, number: u64) -> Result<Vec<ReviewDecision>> {
        let route = self.repo_path(&format!("/pulls/{number}/reviews?per_page=100"));
        let reviews: Vec<ReviewPayload> = self.client.get(route, None::<&()>).await?;
        Ok(latest_decisions(reviews))
    }

    async fn list_check_runs(&self, sha: &str) -> Result<Vec<CheckRun>> {
        let route = self.repo_path(&format!("/commits/{sha}/check-runs?per_page=100"));
        let page: CheckRunsPage = self.client.get(route, None::<&()>).await?;
        Ok(page.check_runs.into_iter().map(to_check_run).collect())
    }

    async fn list_requested_reviewers(&self, number: u64) -> Result<Vec<String>> {
        let route = self.repo_path(&format!("/pulls/{number}/requested_reviewers"));
        let payload: RequestedReviewersPayload = self.client.get(route, None::<&()>).await?;

        let users = payload.users.into_iter().map(|u| u.login);
        let teams = payload
            .teams
            .into_iter()
            .map(|t| format!("{}/{}", self.config.owner, t.slug));
        Ok(users.chain(teams).collect())
    }

    async fn current_user(&self) -> Result<String> {
        let user = self.client.current().user().await?;
        Ok(user.login)
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
