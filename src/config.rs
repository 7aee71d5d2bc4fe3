//! Configuration loading
//!
//! Settings come from `.revstack.toml` at the repository root when present,
//! then from `REVSTACK_*` environment variables. Every field has a default,
//! so the tool works with zero config.

use crate::client::{BreakerSettings, RetryPolicy};
use crate::error::{Error, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file name, looked up at the repository root
pub const CONFIG_FILE: &str = ".revstack.toml";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Remote to push to and detect the forge from
    pub remote: String,
    /// Trunk branch override; detected from the remote when unset
    pub trunk: Option<String>,
    /// Whether the test plan section must be filled in
    pub require_test_plan: bool,
    /// Whether new requests open as drafts
    pub draft: bool,
    /// Reviewers always suggested in the template (`@login` or `@org/team`)
    pub default_reviewers: Vec<String>,
    /// Where saved templates are kept; defaults to the user cache dir
    pub drafts_dir: Option<PathBuf>,
    /// Retry settings
    pub retry: RetrySettings,
    /// Circuit breaker settings
    pub breaker: BreakerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            trunk: None,
            require_test_plan: true,
            draft: false,
            default_reviewers: Vec::new(),
            drafts_dir: None,
            retry: RetrySettings::default(),
            breaker: BreakerConfig::default(),
        }
    }
}

/// `[retry]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// First backoff delay
    pub base_delay_ms: u64,
    /// Backoff ceiling
    pub max_delay_ms: u64,
    /// Per-call timeout
    pub timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay_ms: u64::try_from(policy.base_delay.as_millis()).unwrap_or(u64::MAX),
            max_delay_ms: u64::try_from(policy.max_delay.as_millis()).unwrap_or(u64::MAX),
            timeout_secs: policy.request_timeout.as_secs(),
        }
    }
}

/// `[breaker]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakerConfig {
    /// Consecutive failures before opening
    pub failure_threshold: u32,
    /// Seconds to stay open before probing
    pub cooldown_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        let settings = BreakerSettings::default();
        Self {
            failure_threshold: settings.failure_threshold,
            cooldown_secs: settings.cooldown.as_secs(),
        }
    }
}

impl Config {
    /// Load configuration for the repository at `root`
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Apply `REVSTACK_*` overrides from a variable lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("REVSTACK_REQUIRE_TEST_PLAN") {
            self.require_test_plan = parse_bool("REVSTACK_REQUIRE_TEST_PLAN", &value)?;
        }
        if let Some(value) = lookup("REVSTACK_DRAFT") {
            self.draft = parse_bool("REVSTACK_DRAFT", &value)?;
        }
        if let Some(value) = lookup("REVSTACK_REMOTE") {
            self.remote = value;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.remote.trim().is_empty() {
            return Err(Error::Config("remote must not be empty".to_string()));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(Error::Config(
                "breaker.failure_threshold must be at least 1".to_string(),
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(Error::Config(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Retry policy for the forge client
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            request_timeout: Duration::from_secs(self.retry.timeout_secs),
        }
    }

    /// Circuit breaker settings
    pub const fn breaker_settings(&self) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.breaker.failure_threshold,
            cooldown: Duration::from_secs(self.breaker.cooldown_secs),
        }
    }

    /// Directory for saved templates
    pub fn drafts_dir(&self) -> PathBuf {
        self.drafts_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("revstack")
                .join("drafts")
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{key}: expected a boolean, got '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.remote, "origin");
        assert!(config.require_test_plan);
        assert!(!config.draft);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
trunk = "develop"
require_test_plan = false
default_reviewers = ["@alice", "@acme/platform"]

[retry]
max_retries = 5
base_delay_ms = 100

[breaker]
cooldown_secs = 10
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.trunk.as_deref(), Some("develop"));
        assert!(!config.require_test_plan);
        assert_eq!(config.default_reviewers.len(), 2);
        assert_eq!(config.retry_policy().max_retries, 5);
        assert_eq!(config.retry_policy().base_delay, Duration::from_millis(100));
        assert_eq!(config.breaker_settings().cooldown, Duration::from_secs(10));
        assert_eq!(config.breaker.failure_threshold, 5);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(toml::from_str::<Config>("requre_test_plan = true").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(|key| match key {
                "REVSTACK_DRAFT" => Some("yes".to_string()),
                "REVSTACK_REMOTE" => Some("upstream".to_string()),
                _ => None,
            })
            .unwrap();
        assert!(config.draft);
        assert_eq!(config.remote, "upstream");

        let err = config.apply_env(|key| (key == "REVSTACK_DRAFT").then(|| "maybe".to_string()));
        assert!(err.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "draft = true\n").unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert!(config.draft);
    }
}
