//! Error types for revstack
//!
//! Every failure is classified so callers can decide between retrying,
//! reporting, resuming, or exiting quietly.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure classes used for retry and reporting decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network failure, 5xx, or rate limit; retried by the client
    Transport,
    /// 4xx (other than rate limit) or a malformed response
    NonRetryable,
    /// Circuit breaker short-circuited the call locally
    BreakerOpen,
    /// Review metadata failed validation; resumable
    Validation,
    /// User interrupt or editor abort
    Cancellation,
    /// Ancestry or default branch could not be resolved
    Detection,
    /// Local plumbing (git, config, auth, io)
    Local,
}

/// Errors that can occur in revstack
#[derive(Error, Debug)]
pub enum Error {
    /// Forge responded with an HTTP error status
    #[error("forge API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Message from the forge
        message: String,
    },

    /// Forge rate limit hit
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Connection-level failure or timeout
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Non-retryable failure of a named operation
    #[error("{operation} failed: {source}")]
    Request {
        /// Operation name
        operation: String,
        /// Underlying classified error
        #[source]
        source: Box<Error>,
    },

    /// Retryable failure persisted through every attempt
    #[error("{operation} failed after {attempts} attempts (max retries exceeded): {source}")]
    MaxRetriesExceeded {
        /// Operation name
        operation: String,
        /// Total attempts made
        attempts: u32,
        /// Last error seen
        #[source]
        source: Box<Error>,
    },

    /// Circuit breaker is open; no network attempt was made
    #[error("forge temporarily unavailable (circuit breaker open), skipped {operation}")]
    CircuitOpen {
        /// Operation that was short-circuited
        operation: String,
    },

    /// Review metadata failed validation
    #[error("review metadata is invalid:\n  - {}\nfix it with `revstack submit --continue` (saved to {})", .errors.join("\n  - "), .draft.display())]
    Validation {
        /// One message per problem
        errors: Vec<String>,
        /// Saved document to resume from
        draft: PathBuf,
    },

    /// Operation cancelled by the user
    #[error("cancelled")]
    Cancelled,

    /// Base branch or ancestry could not be determined
    #[error("cannot detect base branch: {0}")]
    Detection(String),

    /// Git command failed
    #[error("git error: {0}")]
    Git(String),

    /// Authentication error
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Configuration error
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Parse error
    #[error("parse error: {0}")]
    Parse(String),

    /// External editor failed
    #[error("editor error: {0}")]
    Editor(String),

    /// No supported remotes found
    #[error("no supported remotes found (GitHub or GitLab)")]
    NoSupportedRemotes,

    /// Remote not found
    #[error("remote '{0}' not found")]
    RemoteNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify this error
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Network(_) | Self::RateLimited(_) => ErrorClass::Transport,
            Self::Api { status, .. } if *status >= 500 => ErrorClass::Transport,
            Self::Api { .. } | Self::MalformedResponse(_) => ErrorClass::NonRetryable,
            Self::Request { source, .. } => source.class(),
            Self::MaxRetriesExceeded { .. } => ErrorClass::Transport,
            Self::CircuitOpen { .. } => ErrorClass::BreakerOpen,
            Self::Validation { .. } => ErrorClass::Validation,
            Self::Cancelled => ErrorClass::Cancellation,
            Self::Detection(_) => ErrorClass::Detection,
            Self::Git(_)
            | Self::Auth(_)
            | Self::Config(_)
            | Self::Parse(_)
            | Self::Editor(_)
            | Self::NoSupportedRemotes
            | Self::RemoteNotFound(_)
            | Self::Io(_)
            | Self::Internal(_) => ErrorClass::Local,
        }
    }

    /// Whether a single attempt that failed with this error may be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether this error should abort a whole batch rather than one item
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.class(),
            ErrorClass::Cancellation | ErrorClass::BreakerOpen
        )
    }

    /// Build an error from an HTTP status and message
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == 429 || (status == 403 && message.to_lowercase().contains("rate limit")) {
            Self::RateLimited(message)
        } else {
            Self::Api { status, message }
        }
    }
}

impl From<octocrab::Error> for Error {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => {
                Self::from_status(source.status_code.as_u16(), source.message.clone())
            }
            octocrab::Error::Serde { source, .. } => Self::MalformedResponse(source.to_string()),
            octocrab::Error::Json { source, .. } => Self::MalformedResponse(source.to_string()),
            other => Self::Network(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::from_status(status.as_u16(), err.to_string())
        } else if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
