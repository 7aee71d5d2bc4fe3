//! Submission engine
//!
//! Handles the workflow of submitting one branch as a review request:
//! 1. Detection - base branch, parent and dependents
//! 2. Planning - fast path (push only) or full path (metadata)
//! 3. Execution - push, create or update, request reviewers

mod analysis;
mod execute;
mod plan;
mod progress;

pub use analysis::{analysis_from_commits, analyze_commits, suggest_reviewers};
pub use execute::{StackSummary, SubmitAction, SubmitOutcome, SubmitReport, Workflow};
pub use plan::{SubmitOptions, SubmitPath, choose_path};
pub use progress::{NoopProgress, Phase, ProgressCallback, PushStatus};
