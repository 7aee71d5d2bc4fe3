//! Template generation

use super::{
    BASE_BRANCH_PREFIX, DRAFT, ISSUES, READ_ONLY_SUFFIX, REVIEWERS, SUMMARY, TEST_PLAN, TITLE,
};
use crate::types::{CommitAnalysis, StackingContext};
use std::fmt::Write;

/// Everything a fresh template is built from
#[derive(Debug, Clone)]
pub struct TemplateInput<'a> {
    /// Commit analysis for the branch
    pub analysis: &'a CommitAnalysis,
    /// Detected base, parent and dependents
    pub context: &'a StackingContext,
    /// Title of an existing request, preferred over the analysed one
    pub existing_title: Option<&'a str>,
    /// Suggested reviewer handles, with `@`
    pub suggested_reviewers: &'a [String],
    /// Initial draft flag
    pub draft: bool,
    /// Whether the test plan is mandatory
    pub require_test_plan: bool,
}

/// Render a fresh template document
pub fn generate(input: &TemplateInput<'_>) -> String {
    let context = input.context;
    let mut doc = String::new();

    let _ = writeln!(
        doc,
        "# Review request for '{}' -> '{}'",
        context.current_branch, context.base_branch
    );
    if let Some(parent) = &context.parent {
        let _ = writeln!(
            doc,
            "# Stacked on #{} ({}): {}",
            parent.number, parent.head.name, parent.title
        );
    }
    doc.push_str("#\n");
    doc.push_str("# Lines starting with '# ' are ignored.\n");
    let _ = writeln!(doc, "# {TITLE} is required.");
    if input.require_test_plan {
        let _ = writeln!(doc, "# {TEST_PLAN} is required.");
    }
    let _ = writeln!(
        doc,
        "# {REVIEWERS} takes @login or @org/team, separated by commas or spaces."
    );
    let _ = writeln!(
        doc,
        "# {ISSUES} takes issue numbers or references; each becomes a \"Closes\" line."
    );
    doc.push_str("# Save and quit to submit. Quit without saving to cancel.\n");

    let title = input.existing_title.unwrap_or(&input.analysis.title);
    let _ = writeln!(doc, "{TITLE}\n{}\n", title.trim());
    let _ = writeln!(doc, "{SUMMARY}\n{}\n", input.analysis.summary.trim());
    let _ = writeln!(doc, "{TEST_PLAN}\n");

    let _ = writeln!(doc, "{REVIEWERS}");
    if !input.suggested_reviewers.is_empty() {
        let _ = writeln!(doc, "# suggested: {}", input.suggested_reviewers.join(" "));
    }
    doc.push('\n');

    let _ = writeln!(doc, "{ISSUES}\n");
    let _ = writeln!(doc, "{DRAFT}\n{}\n", input.draft);

    let _ = writeln!(
        doc,
        "{BASE_BRANCH_PREFIX} {} {READ_ONLY_SUFFIX}",
        context.base_branch
    );

    if context.show_dependents {
        let _ = writeln!(
            doc,
            "# WARNING: {} open request(s) are based on '{}':",
            context.dependents.len(),
            context.current_branch
        );
        for dependent in &context.dependents {
            let _ = writeln!(
                doc,
                "# WARNING:   #{} {}: {}",
                dependent.number, dependent.head.name, dependent.title
            );
        }
    }

    doc
}
