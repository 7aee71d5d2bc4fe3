//! Deps command - list open requests based on a branch

use crate::cli::context::CommandContext;
use crate::cli::style::{
    Stream, Stylize, bullet, check_status, hyperlink_url, review_status, spinner_style,
};
use anstream::println;
use indicatif::ProgressBar;
use revstack::error::Result;
use revstack::repo::Repository;
use revstack::stack::find_dependents;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run the deps command
pub async fn run_deps(
    path: &Path,
    branch: Option<&str>,
    remote: Option<&str>,
    cancel: CancellationToken,
) -> Result<()> {
    let ctx = CommandContext::open(path, remote, cancel).await?;
    let branch = match branch {
        Some(branch) => branch.to_string(),
        None => ctx.repo.current_branch().await?,
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message(format!("Looking for requests based on {}...", branch.accent()));
    spinner.enable_steady_tick(Duration::from_millis(80));

    let result = async {
        let (mut dependents, any) = find_dependents(&ctx.client, &branch).await?;
        let summary = if any {
            Some(ctx.client.enrich_many(&mut dependents).await?)
        } else {
            None
        };
        Ok::<_, revstack::Error>((dependents, summary))
    }
    .await;
    spinner.finish_and_clear();
    let (dependents, summary) = result?;

    if dependents.is_empty() {
        println!("No open requests are based on {}", branch.accent());
        return Ok(());
    }

    println!("Requests based on {}:", branch.emphasis());
    for request in &dependents {
        let number = format!("#{}", request.number);
        let status = if request.is_enriched() {
            format!(
                "{} {} {}",
                review_status(request.review_status()),
                "·".muted(),
                check_status(request.check_status())
            )
        } else {
            "status unavailable".muted().to_string()
        };
        println!(
            "  {} {} {} {}",
            bullet(),
            number.accent(),
            request.head.name.emphasis(),
            request.title
        );
        println!(
            "      {}  {}",
            status,
            hyperlink_url(Stream::Stdout, &request.html_url).muted()
        );
    }

    if let Some(summary) = summary
        && summary.failed > 0
    {
        println!(
            "{}",
            format!("{} of {} requests could not be checked", summary.failed, dependents.len())
                .warn()
                .on(Stream::Stdout)
        );
    }
    Ok(())
}
