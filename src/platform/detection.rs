//! Platform detection from remote URLs

use crate::error::{Error, Result};
use crate::types::{Platform, PlatformConfig};
use regex::Regex;
use std::env;
use std::sync::LazyLock;

// SSH: git@host:owner/repo.git, ssh://git@host/owner/repo.git
// HTTPS: https://host/owner/repo.git
static SCP_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@/]+@[^:]+:(.+?)(?:\.git)?/?$").expect("valid regex"));
static URL_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z+]+://[^/]+/(.+?)(?:\.git)?/?$").expect("valid regex"));

/// Default public host for a platform
const fn public_host(platform: Platform) -> &'static str {
    match platform {
        Platform::GitHub => "github.com",
        Platform::GitLab => "gitlab.com",
    }
}

/// Detect platform (GitHub or GitLab) from a remote URL
///
/// Self-hosted instances are recognised through `GH_HOST` and `GITLAB_HOST`.
pub fn detect_platform(url: &str) -> Option<Platform> {
    let hostname = extract_hostname(url)?;

    [
        (Platform::GitHub, env::var("GH_HOST").ok()),
        (Platform::GitLab, env::var("GITLAB_HOST").ok()),
    ]
    .into_iter()
    .find(|(platform, custom)| {
        let public = public_host(*platform);
        hostname == public
            || hostname.ends_with(&format!(".{public}"))
            || custom.as_deref() == Some(hostname.as_str())
    })
    .map(|(platform, _)| platform)
}

/// Parse repository info (owner/repo) from a remote URL
pub fn parse_repo_info(url: &str) -> Result<PlatformConfig> {
    let platform = detect_platform(url).ok_or(Error::NoSupportedRemotes)?;

    let path = SCP_PATH
        .captures(url)
        .or_else(|| URL_PATH.captures(url))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| Error::Parse(format!("cannot parse remote URL: {url}")))?;

    // GitLab supports nested groups, so the owner is everything but the last part
    let (owner, repo) = path
        .rsplit_once('/')
        .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
        .ok_or_else(|| Error::Parse(format!("invalid repo path: {path}")))?;

    let host = extract_hostname(url).filter(|h| h != public_host(platform));

    Ok(PlatformConfig {
        platform,
        owner: owner.to_string(),
        repo: repo.to_string(),
        host,
    })
}

fn extract_hostname(url: &str) -> Option<String> {
    if !url.contains("://") {
        // scp-like syntax: user@host:path
        return url
            .split_once('@')
            .and_then(|(_, rest)| rest.split(':').next())
            .map(ToString::to_string);
    }

    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(ToString::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_github_variants() {
        for url in [
            "https://github.com/owner/repo.git",
            "git@github.com:owner/repo.git",
            "ssh://git@github.com/owner/repo",
        ] {
            assert_eq!(detect_platform(url), Some(Platform::GitHub), "{url}");
        }
    }

    #[test]
    fn test_detect_unknown_host() {
        assert_eq!(detect_platform("https://example.org/owner/repo.git"), None);
    }

    #[test]
    fn test_parse_github_repo() {
        let config = parse_repo_info("git@github.com:owner/repo.git").unwrap();
        assert_eq!(config.platform, Platform::GitHub);
        assert_eq!(config.owner, "owner");
        assert_eq!(config.repo, "repo");
        assert!(config.host.is_none());
    }

    #[test]
    fn test_parse_gitlab_nested_groups() {
        let config = parse_repo_info("https://gitlab.com/group/subgroup/repo.git").unwrap();
        assert_eq!(config.platform, Platform::GitLab);
        assert_eq!(config.owner, "group/subgroup");
        assert_eq!(config.repo, "repo");
    }

    #[test]
    fn test_parse_rejects_missing_owner() {
        assert!(parse_repo_info("https://github.com/repo.git").is_err());
    }
}
