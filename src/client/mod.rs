//! Resilient forge client
//!
//! Every remote read and write goes through [`ForgeClient::call`], which
//! consults the process-wide [`CircuitBreaker`], applies a per-attempt
//! timeout, retries transport failures with capped exponential backoff, and
//! stops immediately when the cancellation token fires.

mod breaker;
mod enrich;
mod retry;

pub use breaker::{Admission, BreakerSettings, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use enrich::{ENRICH_CONCURRENCY, EnrichSummary};
pub use retry::RetryPolicy;

use crate::cache::{NoCache, ResultCache};
use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{
    NewReviewRequest, PlatformConfig, ReviewRequest, ReviewRequestUpdate, ReviewerSet,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long a listing of open requests stays cached
const OPEN_LIST_TTL: Duration = Duration::from_secs(60);
/// How long the current user's login stays cached
const CURRENT_USER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.release_probe();
        }
    }
}

/// Forge client with circuit breaker, retries and caching
pub struct ForgeClient {
    platform: Box<dyn PlatformService>,
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
    cache: Arc<dyn ResultCache>,
    cancel: CancellationToken,
}

impl ForgeClient {
    /// Create a client around a platform service and a shared breaker
    pub fn new(platform: Box<dyn PlatformService>, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            platform,
            breaker,
            policy: RetryPolicy::default(),
            cache: Arc::new(NoCache),
            cancel: CancellationToken::new(),
        }
    }

    /// Use a specific retry policy
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a result cache
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Stop waiting (backoff, enrichment, in-flight calls) when `token` fires
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The shared circuit breaker
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// The platform configuration
    pub fn config(&self) -> &PlatformConfig {
        self.platform.config()
    }

    /// Run one logical request with breaker, timeout, retries and cancellation
    ///
    /// Makes at most `max_retries + 1` attempts. Only the final outcome is
    /// recorded on the breaker.
    pub async fn call<T, F, Fut>(&self, operation: &str, mut attempt_fn: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let admission = self.breaker.admit();
        if admission == Admission::Rejected {
            debug!(operation, "circuit open, short-circuiting");
            return Err(Error::CircuitOpen {
                operation: operation.to_string(),
            });
        }
        // Hands the probe back if this call ends without recording an outcome
        let mut probe = ProbeGuard {
            breaker: &self.breaker,
            armed: admission == Admission::Probe,
        };

        let mut attempt: u32 = 0;
        loop {
            let outcome = tokio::select! {
                () = self.cancel.cancelled() => return Err(Error::Cancelled),
                outcome = tokio::time::timeout(self.policy.request_timeout, attempt_fn()) => outcome,
            };

            let err = match outcome {
                Ok(Ok(value)) => {
                    probe.armed = false;
                    self.breaker.record_success();
                    return Ok(value);
                }
                Ok(Err(Error::Cancelled)) => return Err(Error::Cancelled),
                Ok(Err(err)) => err,
                Err(_) => Error::Network(format!(
                    "no response within {}s",
                    self.policy.request_timeout.as_secs()
                )),
            };

            if !err.is_retryable() {
                probe.armed = false;
                self.breaker.record_failure();
                return Err(Error::Request {
                    operation: operation.to_string(),
                    source: Box::new(err),
                });
            }

            if attempt >= self.policy.max_retries {
                probe.armed = false;
                self.breaker.record_failure();
                return Err(Error::MaxRetriesExceeded {
                    operation: operation.to_string(),
                    attempts: attempt + 1,
                    source: Box::new(err),
                });
            }

            let delay = self.policy.backoff(attempt);
            warn!(
                operation,
                attempt = attempt + 1,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis(),
                error = %err,
                "retrying forge call"
            );

            tokio::select! {
                () = self.cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    fn open_list_key(&self) -> String {
        let config = self.platform.config();
        format!("open:{:?}:{}/{}", config.platform, config.owner, config.repo)
    }

    fn invalidate_open_list(&self) {
        self.cache.invalidate(&self.open_list_key());
    }

    /// Open requests, most recently updated first
    pub async fn list_open(&self) -> Result<Vec<ReviewRequest>> {
        let key = self.open_list_key();
        if let Some(cached) = self.cache.get(&key) {
            match serde_json::from_str(&cached) {
                Ok(requests) => {
                    debug!("open review requests served from cache");
                    return Ok(requests);
                }
                Err(e) => debug!(error = %e, "discarding unreadable cache entry"),
            }
        }

        let requests = self
            .call("list open review requests", || self.platform.list_open())
            .await?;

        if let Ok(encoded) = serde_json::to_string(&requests) {
            self.cache.set(&key, encoded, OPEN_LIST_TTL);
        }
        Ok(requests)
    }

    /// Open request for a head branch, if any
    pub async fn find_existing(&self, head_branch: &str) -> Result<Option<ReviewRequest>> {
        self.call("find review request", || {
            self.platform.find_existing(head_branch)
        })
        .await
    }

    /// Create a review request
    pub async fn create(&self, request: &NewReviewRequest) -> Result<ReviewRequest> {
        let created = self
            .call("create review request", || self.platform.create(request))
            .await?;
        self.invalidate_open_list();
        Ok(created)
    }

    /// Patch an existing review request
    pub async fn update(
        &self,
        number: u64,
        update: &ReviewRequestUpdate,
    ) -> Result<ReviewRequest> {
        let updated = self
            .call("update review request", || {
                self.platform.update(number, update)
            })
            .await?;
        self.invalidate_open_list();
        Ok(updated)
    }

    /// Request reviews
    pub async fn request_reviewers(&self, number: u64, reviewers: &ReviewerSet) -> Result<()> {
        if reviewers.is_empty() {
            return Ok(());
        }
        self.call("request reviewers", || {
            self.platform.request_reviewers(number, reviewers)
        })
        .await
    }

    /// Move a draft to ready for review
    pub async fn mark_ready(&self, request: &ReviewRequest) -> Result<()> {
        self.call("mark ready for review", || self.platform.mark_ready(request))
            .await?;
        self.invalidate_open_list();
        Ok(())
    }

    /// Login of the authenticated user
    pub async fn current_user(&self) -> Result<String> {
        let key = format!("user:{:?}", self.platform.config().platform);
        if let Some(login) = self.cache.get(&key) {
            return Ok(login);
        }

        let login = self
            .call("get current user", || self.platform.current_user())
            .await?;
        self.cache.set(&key, login.clone(), CURRENT_USER_TTL);
        Ok(login)
    }
}
