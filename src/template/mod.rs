//! Review metadata template
//!
//! Review metadata is collected through a plain-text document with fixed
//! section markers. The document is generated from commit analysis, edited
//! in the user's editor, parsed back and validated. A document that fails
//! validation is saved so `--continue` can reopen it.

mod editor;
mod generate;
mod parse;
mod session;
mod store;
mod validate;

pub use editor::{Editor, ExternalEditor, editor_command};
pub use generate::{TemplateInput, generate};
pub use parse::{is_blank, parse};
pub use session::{EditOutcome, MetadataSession, SessionStart, SessionState};
pub use store::{DraftStore, SavedDraft};
pub use validate::{ValidationRules, validate};

use crate::types::ReviewerSet;

const TITLE: &str = "[title]";
const SUMMARY: &str = "[summary]";
const TEST_PLAN: &str = "[test-plan]";
const REVIEWERS: &str = "[reviewers]";
const ISSUES: &str = "[issues]";
const DRAFT: &str = "[draft]";
const BASE_BRANCH_PREFIX: &str = "# base-branch:";
const READ_ONLY_SUFFIX: &str = "(read-only)";

/// Fields recovered from a template document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFields {
    /// Request title
    pub title: String,
    /// Summary body
    pub summary: String,
    /// How the change was tested
    pub test_plan: String,
    /// Reviewer tokens as written (`@login`, `@org/team`)
    pub reviewers: Vec<String>,
    /// Issue references (`#12`, `owner/repo#12`, URLs)
    pub issues: Vec<String>,
    /// Draft flag; `None` when the value was not recognised
    pub draft: Option<bool>,
    /// Base branch shown in the document, display only
    pub base_branch: Option<String>,
}

impl TemplateFields {
    /// Draft flag, treating an unrecognised value as not draft
    pub fn is_draft(&self) -> bool {
        self.draft.unwrap_or(false)
    }

    /// Split well-formed reviewer tokens into users and teams
    ///
    /// `@org/team` becomes team `team`; other `@login` tokens become users.
    /// Tokens without a leading `@` are skipped.
    pub fn reviewer_set(&self) -> ReviewerSet {
        let mut set = ReviewerSet::default();
        for token in &self.reviewers {
            let Some(handle) = token.strip_prefix('@').filter(|h| !h.is_empty()) else {
                continue;
            };
            match handle.split_once('/') {
                Some((_, team)) if !team.is_empty() => push_unique(&mut set.teams, team),
                Some(_) => {}
                None => push_unique(&mut set.users, handle),
            }
        }
        set
    }

    /// Description body sent to the forge
    pub fn render_body(&self) -> String {
        let mut sections = Vec::new();

        let summary = self.summary.trim();
        if !summary.is_empty() {
            sections.push(summary.to_string());
        }

        let test_plan = self.test_plan.trim();
        if !test_plan.is_empty() {
            sections.push(format!("## Test Plan\n\n{test_plan}"));
        }

        if !self.issues.is_empty() {
            let closes: Vec<String> = self
                .issues
                .iter()
                .map(|issue| format!("Closes {}", issue_ref(issue)))
                .collect();
            sections.push(closes.join("\n"));
        }

        sections.join("\n\n")
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v.eq_ignore_ascii_case(value)) {
        list.push(value.to_string());
    }
}

/// Bare numbers become `#N`; anything else is kept as written
fn issue_ref(issue: &str) -> String {
    if issue.chars().all(|c| c.is_ascii_digit()) {
        format!("#{issue}")
    } else {
        issue.to_string()
    }
}
