//! GitLab platform service implementation

use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{
    BranchRef, CheckConclusion, CheckRun, CheckRunStatus, NewReviewRequest, Platform,
    PlatformConfig, RequestState, ReviewDecision, ReviewRequest, ReviewRequestUpdate,
    ReviewState, ReviewerSet,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// GitLab service using reqwest
pub struct GitLabService {
    client: Client,
    token: String,
    base_url: String,
    config: PlatformConfig,
    project_path: String,
}

#[derive(Deserialize)]
struct GitLabUser {
    id: u64,
    username: String,
}

#[derive(Deserialize)]
struct DiffRefs {
    base_sha: Option<String>,
    head_sha: Option<String>,
}

#[derive(Deserialize)]
struct MergeRequest {
    id: u64,
    iid: u64,
    web_url: String,
    source_branch: String,
    target_branch: String,
    title: String,
    state: String,
    #[serde(default)]
    draft: bool,
    sha: Option<String>,
    diff_refs: Option<DiffRefs>,
    author: Option<GitLabUser>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    reviewers: Vec<GitLabUser>,
}

#[derive(Deserialize)]
struct ApprovedBy {
    user: GitLabUser,
}

#[derive(Deserialize)]
struct Approvals {
    #[serde(default)]
    approved_by: Vec<ApprovedBy>,
}

#[derive(Deserialize)]
struct CommitStatus {
    name: String,
    status: String,
}

#[derive(Serialize)]
struct CreateMrPayload<'a> {
    source_branch: &'a str,
    target_branch: &'a str,
    title: String,
    description: &'a str,
}

#[derive(Serialize, Default)]
struct UpdateMrPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    target_branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reviewer_ids: Option<Vec<u64>>,
}

const DRAFT_PREFIX: &str = "Draft: ";

impl GitLabService {
    /// Create a new GitLab service
    pub fn new(token: String, owner: String, repo: String, host: Option<String>) -> Self {
        let host = host.unwrap_or_else(|| "gitlab.com".to_string());
        let base_url = format!("https://{host}/api/v4");
        Self::with_base_url(token, owner, repo, host, base_url)
    }

    /// Create a service against an explicit API root (e.g. a test server)
    pub fn with_base_url(
        token: String,
        owner: String,
        repo: String,
        host: String,
        base_url: String,
    ) -> Self {
        let project_path = format!("{owner}/{repo}");

        Self {
            client: Client::new(),
            token,
            base_url,
            config: PlatformConfig {
                platform: Platform::GitLab,
                owner,
                repo,
                host: if host == "gitlab.com" {
                    None
                } else {
                    Some(host)
                },
            },
            project_path,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn project_url(&self, path: &str) -> String {
        let encoded = urlencoding::encode(&self.project_path);
        self.api_url(&format!("/projects/{encoded}{path}"))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.header("PRIVATE-TOKEN", &self.token).send().await?;
        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(e.to_string()))
    }

    /// Like [`Self::send`], also returning the `x-next-page` header
    async fn send_page<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<(T, Option<u32>)> {
        let response = request.header("PRIVATE-TOKEN", &self.token).send().await?;
        let response = check_status(response).await?;
        let next = response
            .headers()
            .get("x-next-page")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let items = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;
        Ok((items, next))
    }

    async fn user_id(&self, username: &str) -> Result<u64> {
        let users: Vec<GitLabUser> = self
            .send(
                self.client
                    .get(self.api_url("/users"))
                    .query(&[("username", username)]),
            )
            .await?;

        users
            .first()
            .map(|u| u.id)
            .ok_or_else(|| Error::from_status(404, format!("unknown GitLab user '{username}'")))
    }

    async fn fetch_mr(&self, number: u64) -> Result<MergeRequest> {
        self.send(
            self.client
                .get(self.project_url(&format!("/merge_requests/{number}"))),
        )
        .await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::from_status(status.as_u16(), body))
}

fn strip_draft_prefix(title: &str) -> &str {
    title
        .strip_prefix(DRAFT_PREFIX)
        .or_else(|| title.strip_prefix("WIP: "))
        .unwrap_or(title)
}

fn to_review_request(mr: MergeRequest) -> ReviewRequest {
    let (base_sha, head_sha) = mr
        .diff_refs
        .map(|d| (d.base_sha.unwrap_or_default(), d.head_sha))
        .unwrap_or_default();

    ReviewRequest {
        number: mr.iid,
        node_id: format!("gid://gitlab/MergeRequest/{}", mr.id),
        draft: mr.draft || mr.title.starts_with(DRAFT_PREFIX),
        title: strip_draft_prefix(&mr.title).to_string(),
        state: if mr.state == "opened" {
            RequestState::Open
        } else {
            RequestState::Closed
        },
        head: BranchRef::new(mr.source_branch, head_sha.or(mr.sha).unwrap_or_default()),
        base: BranchRef::new(mr.target_branch, base_sha),
        author: mr.author.map(|a| a.username).unwrap_or_default(),
        html_url: mr.web_url,
        created_at: mr.created_at,
        updated_at: mr.updated_at,
        reviews: None,
        check_runs: None,
        requested_reviewers: None,
    }
}

fn to_check_run(status: CommitStatus) -> CheckRun {
    let (run_status, conclusion) = match status.status.as_str() {
        "success" => (CheckRunStatus::Completed, Some(CheckConclusion::Success)),
        "failed" => (CheckRunStatus::Completed, Some(CheckConclusion::Failure)),
        "canceled" => (CheckRunStatus::Completed, Some(CheckConclusion::Cancelled)),
        "skipped" => (CheckRunStatus::Completed, Some(CheckConclusion::Skipped)),
        "manual" => (
            CheckRunStatus::Completed,
            Some(CheckConclusion::ActionRequired),
        ),
        "running" => (CheckRunStatus::InProgress, None),
        _ => (CheckRunStatus::Queued, None),
    };
    CheckRun {
        name: status.name,
        status: run_status,
        conclusion,
    }
}

#[async_trait]
impl PlatformService for GitLabService {
    async fn list_open(&self) -> Result<Vec<ReviewRequest>> {
        let mut mrs = Vec::new();
        let mut page = 1_u32;
        loop {
            let page_param = page.to_string();
            let (batch, next): (Vec<MergeRequest>, _) = self
                .send_page(self.client.get(self.project_url("/merge_requests")).query(&[
                    ("state", "opened"),
                    ("order_by", "updated_at"),
                    ("sort", "desc"),
                    ("per_page", "100"),
                    ("page", page_param.as_str()),
                ]))
                .await?;
            mrs.extend(batch);

            // Empty header on the last page
            match next {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(mrs.into_iter().map(to_review_request).collect())
    }

    async fn find_existing(&self, head_branch: &str) -> Result<Option<ReviewRequest>> {
        let mrs: Vec<MergeRequest> = self
            .send(
                self.client
                    .get(self.project_url("/merge_requests"))
                    .query(&[("source_branch", head_branch), ("state", "opened")]),
            )
            .await?;

        Ok(mrs.into_iter().next().map(to_review_request))
    }

    async fn create(&self, request: &NewReviewRequest) -> Result<ReviewRequest> {
        let title = if request.draft {
            format!("{DRAFT_PREFIX}{}", request.title)
        } else {
            request.title.clone()
        };
        let payload = CreateMrPayload {
            source_branch: &request.head,
            target_branch: &request.base,
            title,
            description: &request.body,
        };

        let mr: MergeRequest = self
            .send(
                self.client
                    .post(self.project_url("/merge_requests"))
                    .json(&payload),
            )
            .await?;
        Ok(to_review_request(mr))
    }

    async fn update(&self, number: u64, update: &ReviewRequestUpdate) -> Result<ReviewRequest> {
        let title = match &update.title {
            // Keep the draft marker, which lives in the title on GitLab
            Some(title) => {
                let current = self.fetch_mr(number).await?;
                Some(if current.title.starts_with(DRAFT_PREFIX) {
                    format!("{DRAFT_PREFIX}{title}")
                } else {
                    title.clone()
                })
            }
            None => None,
        };
        let payload = UpdateMrPayload {
            target_branch: update.base.as_deref(),
            title,
            description: update.body.as_deref(),
            ..UpdateMrPayload::default()
        };

        let mr: MergeRequest = self
            .send(
                self.client
                    .put(self.project_url(&format!("/merge_requests/{number}")))
                    .json(&payload),
            )
            .await?;
        Ok(to_review_request(mr))
    }

    async fn request_reviewers(&self, number: u64, reviewers: &ReviewerSet) -> Result<()> {
        if !reviewers.teams.is_empty() {
            return Err(Error::from_status(
                422,
                format!(
                    "GitLab does not support team reviewers: {}",
                    reviewers.teams.join(", ")
                ),
            ));
        }

        let current = self.fetch_mr(number).await?;
        let mut ids: Vec<u64> = current.reviewers.iter().map(|u| u.id).collect();
        for username in &reviewers.users {
            let id = self.user_id(username).await?;
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        let payload = UpdateMrPayload {
            reviewer_ids: Some(ids),
            ..UpdateMrPayload::default()
        };
        let _: MergeRequest = self
            .send(
                self.client
                    .put(self.project_url(&format!("/merge_requests/{number}")))
                    .json(&payload),
            )
            .await?;
        Ok(())
    }

    async fn mark_ready(&self, request: &ReviewRequest) -> Result<()> {
        let current = self.fetch_mr(request.number).await?;
        let payload = UpdateMrPayload {
            title: Some(strip_draft_prefix(&current.title).to_string()),
            ..UpdateMrPayload::default()
        };

        let _: MergeRequest = self
            .send(
                self.client
                    .put(self.project_url(&format!("/merge_requests/{}", request.number)))
                    .json(&payload),
            )
            .await?;
        Ok(())
    }

    async fn list_reviews(&self, number: u64) -> Result<Vec<ReviewDecision>> {
        let approvals: Approvals = self
            .send(
                self.client
                    .get(self.project_url(&format!("/merge_requests/{number}/approvals"))),
            )
            .await?;

        Ok(approvals
            .approved_by
            .into_iter()
            .map(|a| ReviewDecision {
                reviewer: a.user.username,
                state: ReviewState::Approved,
            })
            .collect())
    }

    async fn list_check_runs(&self, sha: &str) -> Result<Vec<CheckRun>> {
        let statuses: Vec<CommitStatus> = self
            .send(
                self.client
                    .get(self.project_url(&format!("/repository/commits/{sha}/statuses"))),
            )
            .await?;

        Ok(statuses.into_iter().map(to_check_run).collect())
    }

    async fn list_requested_reviewers(&self, number: u64) -> Result<Vec<String>> {
        let mr = self.fetch_mr(number).await?;
        Ok(mr.reviewers.into_iter().map(|u| u.username).collect())
    }

    async fn current_user(&self) -> Result<String> {
        let user: GitLabUser = self.send(self.client.get(self.api_url("/user"))).await?;
        Ok(user.username)
    }

    fn config(&self) -> &PlatformConfig {
        &self.config
    }
}
