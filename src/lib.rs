//! revstack - stacked review requests for GitHub and GitLab
//!
//! Submits the current git branch as a pull request (GitHub) or merge
//! request (GitLab), targeting the nearest open ancestor request instead of
//! trunk when the branch is stacked.
//!
//! The pieces, bottom up:
//!
//! - [`client::ForgeClient`] issues every forge call through a circuit
//!   breaker, retry with backoff and a result cache.
//! - [`stack`] detects the base branch and finds dependent requests.
//! - [`template`] collects review metadata through an editor session that
//!   can be resumed after a validation failure.
//! - [`submit::Workflow`] ties them together for one branch.

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod platform;
pub mod repo;
pub mod stack;
pub mod submit;
pub mod template;
pub mod types;

pub use error::{Error, ErrorClass, Result};
