//! Submit command - submit the current branch as a review request

use crate::cli::context::CommandContext;
use crate::cli::progress::CliProgress;
use crate::cli::style::{Stream, Stylize, arrow, check, hyperlink_url};
use anstream::println;
use revstack::error::Result;
use revstack::submit::{SubmitOptions, SubmitOutcome, SubmitReport, Workflow};
use revstack::template::{DraftStore, ExternalEditor};
use std::path::Path;

/// Run the submit command
pub async fn run_submit(
    path: &Path,
    remote: Option<&str>,
    options: &SubmitOptions,
    cancel: tokio_util::sync::CancellationToken,
) -> Result<()> {
    let ctx = CommandContext::open(path, remote, cancel).await?;
    let editor = ExternalEditor::from_env();
    let store = DraftStore::new(ctx.config.drafts_dir());
    let progress = CliProgress::new();

    let workflow = Workflow::new(
        &ctx.client,
        &ctx.repo,
        &editor,
        &store,
        &ctx.config,
        &progress,
    );

    match workflow.execute(options).await? {
        SubmitOutcome::Submitted(report) => print_report(&report),
        SubmitOutcome::Cancelled => {
            println!("{}", "Submission cancelled, nothing was changed.".muted());
        }
    }
    Ok(())
}

fn print_report(report: &SubmitReport) {
    let number = format!("#{}", report.number);
    println!();
    println!(
        "{} {} {} {} {}",
        check(),
        number.accent(),
        report.action.to_string().emphasis(),
        arrow(),
        report.base.accent()
    );

    let stack = &report.stack;
    if let Some(parent) = &stack.context.parent {
        println!(
            "  {} {} ({})",
            "stacked on".muted(),
            format!("#{}", parent.number).accent(),
            parent.head.name
        );
    }
    if stack.base_updated {
        println!("  {}", "base re-targeted".warn().on(Stream::Stdout));
    }
    if stack.rebase_detected {
        println!(
            "  {}",
            "base was rebased; consider rebasing this branch"
                .warn()
                .on(Stream::Stdout)
        );
    }
    if !stack.context.dependents.is_empty() {
        let numbers = stack
            .context
            .dependents
            .iter()
            .map(|d| format!("#{}", d.number))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {} {}", "dependents:".muted(), numbers);
    }
    for warning in &report.warnings {
        println!("  {} {warning}", "warning:".warn().on(Stream::Stdout));
    }
    println!("  {}", hyperlink_url(Stream::Stdout, &report.url));
}
