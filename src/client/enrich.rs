//! Bounded-concurrency enrichment of review requests

use super::ForgeClient;
use crate::error::{Error, Result};
use crate::types::ReviewRequest;
use futures::stream::{self, TryStreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Maximum review requests enriched at once
pub const ENRICH_CONCURRENCY: usize = 4;

/// Outcome counts for one enrichment batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    /// Requests that received reviews, checks and requested reviewers
    pub enriched: usize,
    /// Requests left un-enriched after a non-fatal failure
    pub failed: usize,
}

impl ForgeClient {
    /// Attach reviews, check runs and requested reviewers to each request
    ///
    /// At most [`ENRICH_CONCURRENCY`] requests are in flight. A failure on
    /// one request is logged and leaves it un-enriched; cancellation or an
    /// open breaker aborts the batch.
    pub async fn enrich_many(&self, requests: &mut [ReviewRequest]) -> Result<EnrichSummary> {
        let enriched = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let (enriched_ref, failed_ref) = (&enriched, &failed);

        stream::iter(requests.iter_mut().map(Ok::<_, Error>))
            .try_for_each_concurrent(ENRICH_CONCURRENCY, move |request| async move {
                let number = request.number;
                match self.enrich_one(request).await {
                    Ok(()) => {
                        enriched_ref.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    }
                    Err(err) if err.is_fatal() => Err(err),
                    Err(err) => {
                        warn!(number, error = %err, "failed to enrich review request");
                        failed_ref.fetch_add(1, Ordering::Relaxed);
                        Ok(())
                    }
                }
            })
            .await?;

        let summary = EnrichSummary {
            enriched: enriched.into_inner(),
            failed: failed.into_inner(),
        };
        debug!(
            enriched = summary.enriched,
            failed = summary.failed,
            "enrichment finished"
        );
        Ok(summary)
    }

    /// Enrich a single request; fields are only attached when all three reads succeed
    async fn enrich_one(&self, request: &mut ReviewRequest) -> Result<()> {
        let number = request.number;
        let sha = request.head.sha.as_str();

        let reviews = self
            .call("list reviews", || self.platform.list_reviews(number))
            .await?;
        let check_runs = self
            .call("list check runs", || self.platform.list_check_runs(sha))
            .await?;
        let requested = self
            .call("list requested reviewers", || {
                self.platform.list_requested_reviewers(number)
            })
            .await?;

        request.reviews = Some(reviews);
        request.check_runs = Some(check_runs);
        request.requested_reviewers = Some(requested);
        Ok(())
    }
}
