//! CLI progress callback with styled output and a phase spinner

use crate::cli::style::{Stream, Stylize, check, cross, hyperlink_url, spinner_style};
use anstream::{eprintln, println};
use async_trait::async_trait;
use indicatif::ProgressBar;
use revstack::error::Error;
use revstack::submit::{Phase, ProgressCallback, PushStatus};
use revstack::types::ReviewRequest;
use std::sync::Mutex;
use std::time::Duration;

/// Prints submission progress to the terminal
///
/// Long-running phases show a spinner. The spinner is cleared before the
/// editor opens so it never draws over the editor's screen.
#[derive(Default)]
pub struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn stop_spinner(&self) {
        if let Ok(mut guard) = self.spinner.lock()
            && let Some(spinner) = guard.take()
        {
            spinner.finish_and_clear();
        }
    }

    fn start_spinner(&self, message: String) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.spinner.lock() {
            *guard = Some(spinner);
        }
    }

    /// Print a line without tearing the spinner
    fn line(&self, text: &str) {
        let guard = self.spinner.lock().ok();
        match guard.as_ref().and_then(|g| g.as_ref()) {
            Some(spinner) => spinner.suspend(|| println!("{text}")),
            None => println!("{text}"),
        }
    }

    fn error_line(&self, text: &str) {
        let guard = self.spinner.lock().ok();
        match guard.as_ref().and_then(|g| g.as_ref()) {
            Some(spinner) => spinner.suspend(|| eprintln!("{text}")),
            None => eprintln!("{text}"),
        }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_phase(&self, phase: Phase) {
        self.stop_spinner();
        match phase {
            // Pushing draws its own spinner per branch
            Phase::Editing | Phase::Pushing | Phase::Complete => {}
            _ => self.start_spinner(format!("{}...", phase.to_string().emphasis())),
        }
    }

    async fn on_push(&self, branch: &str, status: PushStatus) {
        match status {
            PushStatus::Started => {
                self.stop_spinner();
                self.start_spinner(format!("Pushing {}...", branch.accent()));
            }
            PushStatus::Success => {
                self.stop_spinner();
                self.line(&format!("  {} Pushed {}", check(), branch.emphasis()));
            }
            PushStatus::Failed(message) => {
                self.stop_spinner();
                self.error_line(&format!(
                    "  {} Failed to push {}: {}",
                    cross(),
                    branch.accent().on(Stream::Stderr),
                    message.error()
                ));
            }
        }
    }

    async fn on_created(&self, request: &ReviewRequest) {
        let number = format!("#{}", request.number);
        let kind = if request.draft { "draft request" } else { "request" };
        self.line(&format!(
            "  {} Created {kind} {} for {} {} {}",
            check(),
            number.accent(),
            request.head.name.emphasis(),
            "→".muted(),
            request.base.name.accent()
        ));
        self.line(&format!("    {}", hyperlink_url(Stream::Stdout, &request.html_url)));
    }

    async fn on_updated(&self, request: &ReviewRequest) {
        let number = format!("#{}", request.number);
        self.line(&format!(
            "  {} Updated {} for {}",
            check(),
            number.accent(),
            request.head.name.emphasis()
        ));
    }

    async fn on_error(&self, err: &Error) {
        self.error_line(&format!("  {}: {err}", "warning".warn()));
    }

    async fn on_message(&self, message: &str) {
        self.line(&format!("  {}", message.muted()));
    }
}
