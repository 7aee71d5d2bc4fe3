//! Stack analysis
//!
//! Works out which branch a review request should target, and which open
//! requests sit on top of a branch.

mod dependents;
mod detect;

pub use dependents::{
    BaseCheck, StackedUpdate, check_stacked_base, detect_base_changed, detect_rebase,
    filter_dependents, find_dependents, handle_stacked_update,
};
pub use detect::{BaseDetection, DetectionRule, detect_base};
pub(crate) use detect::detection_error;
