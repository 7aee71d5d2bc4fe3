//! CLI commands
//!
//! Command implementations for the `revstack` binary.

mod auth;
mod context;
mod deps;
mod progress;
pub mod style;
mod submit;

pub use auth::{AuthCommand, run_auth};
pub use deps::run_deps;
pub use submit::run_submit;
