//! Path selection
//!
//! Decides whether a submission only needs a push or a full metadata pass.

use crate::types::ReviewRequest;

/// Options for one submission
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    /// Open a new request as draft
    pub draft: bool,
    /// Mark the request ready for review
    pub ready: bool,
    /// Edit metadata even when a request exists
    pub force_edit: bool,
    /// Validate the template without opening the editor
    pub skip_editor: bool,
    /// Resume the newest saved template
    pub continue_mode: bool,
    /// Base branch to use instead of detection
    pub base_override: Option<String>,
}

/// How a submission proceeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPath {
    /// Request exists and metadata is untouched: fix the base, push, stop
    Fast,
    /// Collect metadata, then create or update
    Full,
}

/// Choose the path for a branch with an optional existing request
pub const fn choose_path(existing: Option<&ReviewRequest>, options: &SubmitOptions) -> SubmitPath {
    if existing.is_some() && !options.force_edit && !options.continue_mode {
        SubmitPath::Fast
    } else {
        SubmitPath::Full
    }
}
