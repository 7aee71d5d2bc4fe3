//! Submission workflow
//!
//! Detects the base, looks at dependents, then either takes the fast path
//! (re-target if needed, push) or collects metadata and creates or updates
//! the review request. The full path writes nothing to the forge until the
//! metadata session succeeds.

use crate::client::ForgeClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::repo::Repository;
use crate::stack::{
    DetectionRule, check_stacked_base, detect_base, detection_error, find_dependents,
    handle_stacked_update,
};
use crate::submit::analysis::{analyze_commits, suggest_reviewers};
use crate::submit::plan::{SubmitOptions, SubmitPath, choose_path};
use crate::submit::{Phase, ProgressCallback, PushStatus};
use crate::template::{
    DraftStore, EditOutcome, Editor, MetadataSession, SessionStart, TemplateFields,
    TemplateInput, ValidationRules, generate,
};
use crate::types::{NewReviewRequest, ReviewRequest, ReviewRequestUpdate, StackingContext};
use std::fmt;
use tracing::{debug, info, warn};

/// What happened to the review request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitAction {
    /// A new request was opened
    Created,
    /// An existing request's metadata was updated
    Updated,
    /// Existing request; only pushed (and re-targeted if needed)
    FastPath,
}

impl fmt::Display for SubmitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::FastPath => "pushed",
        })
    }
}

/// How the request relates to the rest of the stack
#[derive(Debug, Clone)]
pub struct StackSummary {
    /// Base, parent and dependents
    pub context: StackingContext,
    /// Rule that chose the base
    pub rule: DetectionRule,
    /// Why that base was chosen
    pub explanation: String,
    /// Base was re-targeted on the forge
    pub base_updated: bool,
    /// Base branch was rewritten since the request last saw it
    pub rebase_detected: bool,
}

/// Result of a completed submission
#[derive(Debug, Clone)]
pub struct SubmitReport {
    /// What was done
    pub action: SubmitAction,
    /// Request number
    pub number: u64,
    /// Request URL
    pub url: String,
    /// Base branch the request targets
    pub base: String,
    /// Stack position
    pub stack: StackSummary,
    /// Non-fatal problems
    pub warnings: Vec<String>,
}

/// End state of a submission
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// Request submitted
    Submitted(Box<SubmitReport>),
    /// User cancelled in the editor
    Cancelled,
}

/// Everything a submission needs
pub struct Workflow<'a> {
    client: &'a ForgeClient,
    repo: &'a dyn Repository,
    editor: &'a dyn Editor,
    store: &'a DraftStore,
    config: &'a Config,
    progress: &'a dyn ProgressCallback,
}

impl<'a> Workflow<'a> {
    /// Create a workflow
    pub fn new(
        client: &'a ForgeClient,
        repo: &'a dyn Repository,
        editor: &'a dyn Editor,
        store: &'a DraftStore,
        config: &'a Config,
        progress: &'a dyn ProgressCallback,
    ) -> Self {
        Self {
            client,
            repo,
            editor,
            store,
            config,
            progress,
        }
    }

    async fn trunk(&self) -> Result<String> {
        match &self.config.trunk {
            Some(trunk) => Ok(trunk.clone()),
            None => self.repo.default_branch().await.map_err(detection_error),
        }
    }

    /// Submit the current branch
    pub async fn execute(&self, options: &SubmitOptions) -> Result<SubmitOutcome> {
        self.progress.on_phase(Phase::Detecting).await;

        let current = self.repo.current_branch().await?;
        let trunk = self.trunk().await?;
        if current == trunk {
            return Err(Error::Detection(format!(
                "'{current}' is the trunk branch; check out a feature branch to submit"
            )));
        }

        let detection = detect_base(
            self.client,
            self.repo,
            &current,
            &trunk,
            options.base_override.as_deref(),
        )
        .await?;
        info!(
            branch = %current,
            base = %detection.context.base_branch,
            rule = %detection.rule,
            "detected base branch"
        );
        self.progress.on_message(&detection.explanation).await;

        let (mut dependents, any) = find_dependents(self.client, &current).await?;
        if any {
            self.progress.on_phase(Phase::Enriching).await;
            self.client.enrich_many(&mut dependents).await?;
        }

        let mut stack = StackSummary {
            context: detection.context.with_dependents(dependents),
            rule: detection.rule,
            explanation: detection.explanation,
            base_updated: false,
            rebase_detected: false,
        };

        let existing = self.client.find_existing(&current).await?;
        match choose_path(existing.as_ref(), options) {
            SubmitPath::Fast => {
                // choose_path only picks the fast path for an existing request
                let existing = existing.ok_or_else(|| {
                    Error::Internal("fast path without an existing request".to_string())
                })?;
                self.fast_path(&current, existing, stack, options).await
            }
            SubmitPath::Full => {
                let retarget = match &existing {
                    Some(existing) => self.check_base(existing, &mut stack).await?,
                    None => false,
                };
                self.full_path(&current, existing, stack, retarget, options)
                    .await
            }
        }
    }

    /// Re-target `existing` if its base was renamed, recording what happened
    async fn retarget(
        &self,
        existing: &ReviewRequest,
        stack: &mut StackSummary,
    ) -> Result<ReviewRequest> {
        if existing.base.name != stack.context.base_branch {
            self.progress.on_phase(Phase::UpdatingBase).await;
        }
        let update =
            handle_stacked_update(self.client, self.repo, existing, &stack.context.base_branch)
                .await?;

        if update.base_updated {
            self.progress
                .on_message(&format!(
                    "Re-targeted #{} from {} to {}",
                    update.request.number,
                    update.previous_base.as_deref().unwrap_or_default(),
                    stack.context.base_branch
                ))
                .await;
            self.progress.on_updated(&update.request).await;
        }
        if update.rebase_detected {
            self.report_rebase(existing).await;
        }

        stack.base_updated = update.base_updated;
        stack.rebase_detected = update.rebase_detected;
        Ok(update.request)
    }

    /// Compare `existing` with the detected base; `true` when it needs re-targeting
    async fn check_base(&self, existing: &ReviewRequest, stack: &mut StackSummary) -> Result<bool> {
        let check =
            check_stacked_base(self.repo, existing, &stack.context.base_branch).await?;
        if check.rebase_detected {
            self.report_rebase(existing).await;
        }
        stack.rebase_detected = check.rebase_detected;
        Ok(check.base_changed)
    }

    async fn report_rebase(&self, existing: &ReviewRequest) {
        self.progress
            .on_message(&format!(
                "{} was rebased since #{} was last updated",
                existing.base.name, existing.number
            ))
            .await;
    }

    async fn push(&self, branch: &str) -> Result<()> {
        self.progress.on_phase(Phase::Pushing).await;
        self.progress.on_push(branch, PushStatus::Started).await;
        match self.repo.push(branch).await {
            Ok(()) => {
                self.progress.on_push(branch, PushStatus::Success).await;
                Ok(())
            }
            Err(e) => {
                self.progress
                    .on_push(branch, PushStatus::Failed(e.to_string()))
                    .await;
                Err(e)
            }
        }
    }

    async fn fast_path(
        &self,
        current: &str,
        existing: ReviewRequest,
        mut stack: StackSummary,
        options: &SubmitOptions,
    ) -> Result<SubmitOutcome> {
        debug!(number = existing.number, "taking fast path");
        let request = self.retarget(&existing, &mut stack).await?;
        self.push(current).await?;

        let mut warnings = Vec::new();
        if options.ready && request.draft {
            self.mark_ready(&request, &mut warnings).await?;
        }

        self.progress.on_phase(Phase::Complete).await;
        Ok(SubmitOutcome::Submitted(Box::new(SubmitReport {
            action: SubmitAction::FastPath,
            number: request.number,
            url: request.html_url.clone(),
            base: request.base.name.clone(),
            stack,
            warnings,
        })))
    }

    async fn full_path(
        &self,
        current: &str,
        existing: Option<ReviewRequest>,
        mut stack: StackSummary,
        retarget: bool,
        options: &SubmitOptions,
    ) -> Result<SubmitOutcome> {
        let mut warnings = Vec::new();

        let user = match self.client.current_user().await {
            Ok(user) => Some(user),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "could not determine current user");
                None
            }
        };

        let Some(fields) = self
            .collect_metadata(current, existing.as_ref(), &mut stack, user.as_deref(), options)
            .await?
        else {
            return Ok(SubmitOutcome::Cancelled);
        };

        self.push(current).await?;

        self.progress.on_phase(Phase::Submitting).await;
        let base = stack.context.base_branch.clone();
        let (action, request) = match existing {
            Some(existing) => {
                let update = ReviewRequestUpdate {
                    base: retarget.then(|| base.clone()),
                    title: Some(fields.title.clone()),
                    body: Some(fields.render_body()),
                };
                let request = self.client.update(existing.number, &update).await?;
                if retarget {
                    info!(
                        number = existing.number,
                        from = %existing.base.name,
                        to = %base,
                        "updated base branch"
                    );
                    stack.base_updated = true;
                    self.progress
                        .on_message(&format!(
                            "Re-targeted #{} from {} to {}",
                            request.number, existing.base.name, base
                        ))
                        .await;
                }
                self.progress.on_updated(&request).await;
                (SubmitAction::Updated, request)
            }
            None => {
                let new = NewReviewRequest {
                    head: current.to_string(),
                    base: base.clone(),
                    title: fields.title.clone(),
                    body: fields.render_body(),
                    draft: fields.is_draft() && !options.ready,
                };
                let request = self.client.create(&new).await?;
                self.progress.on_created(&request).await;
                (SubmitAction::Created, request)
            }
        };

        let mut reviewers = fields.reviewer_set();
        if let Some(user) = &user {
            reviewers = reviewers.without_user(user);
        }
        if !reviewers.is_empty() {
            self.progress.on_phase(Phase::RequestingReviewers).await;
            if let Err(e) = self.client.request_reviewers(request.number, &reviewers).await {
                if matches!(e, Error::Cancelled) {
                    return Err(e);
                }
                let message = format!("could not request reviewers on #{}: {e}", request.number);
                warn!(number = request.number, error = %e, "reviewer request failed");
                self.progress.on_error(&e).await;
                warnings.push(message);
            }
        }

        let wants_ready = options.ready || (action == SubmitAction::Updated && !fields.is_draft());
        if wants_ready && request.draft {
            self.mark_ready(&request, &mut warnings).await?;
        }

        if let Err(e) = self.store.clear(current).await {
            warn!(error = %e, "could not remove saved review templates");
        }

        self.progress.on_phase(Phase::Complete).await;
        Ok(SubmitOutcome::Submitted(Box::new(SubmitReport {
            action,
            number: request.number,
            url: request.html_url.clone(),
            base,
            stack,
            warnings,
        })))
    }

    /// Run the template session; `None` when the user cancelled
    async fn collect_metadata(
        &self,
        current: &str,
        existing: Option<&ReviewRequest>,
        stack: &mut StackSummary,
        user: Option<&str>,
        options: &SubmitOptions,
    ) -> Result<Option<TemplateFields>> {
        let start = if options.continue_mode {
            SessionStart::Resume
        } else {
            self.progress.on_phase(Phase::Analyzing).await;
            let analysis = analyze_commits(self.repo, &stack.context.base_branch, current).await?;
            debug!(
                commits = analysis.commit_count,
                merges = analysis.has_merge_commits,
                "analyzed commits"
            );

            if let Some(parent) = stack.context.parent.as_mut()
                && !parent.is_enriched()
            {
                self.client
                    .enrich_many(std::slice::from_mut(parent))
                    .await?;
            }
            let suggestions = suggest_reviewers(
                &self.config.default_reviewers,
                stack.context.parent.as_ref(),
                user,
            );

            let draft = existing.map_or(options.draft || self.config.draft, |r| r.draft);
            SessionStart::Generate(generate(&TemplateInput {
                analysis: &analysis,
                context: &stack.context,
                existing_title: existing.map(|r| r.title.as_str()),
                suggested_reviewers: &suggestions,
                draft,
                require_test_plan: self.config.require_test_plan,
            }))
        };

        self.progress.on_phase(Phase::Editing).await;
        let rules = ValidationRules {
            require_test_plan: self.config.require_test_plan,
            parent: stack.context.parent.as_ref(),
        };
        let outcome = MetadataSession::new(self.editor, self.store, current, rules)
            .skip_editor(options.skip_editor)
            .run(start)
            .await?;

        Ok(match outcome {
            EditOutcome::Ready { fields, .. } => Some(fields),
            EditOutcome::Cancelled => {
                info!(branch = current, "submission cancelled in editor");
                None
            }
        })
    }

    async fn mark_ready(&self, request: &ReviewRequest, warnings: &mut Vec<String>) -> Result<()> {
        match self.client.mark_ready(request).await {
            Ok(()) => {
                self.progress
                    .on_message(&format!("Marked #{} ready for review", request.number))
                    .await;
                Ok(())
            }
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                warn!(number = request.number, error = %e, "mark ready failed");
                self.progress.on_error(&e).await;
                warnings.push(format!("could not mark #{} ready: {e}", request.number));
                Ok(())
            }
        }
    }
}
