//! Per-job status probes.
//!
//! A probe never fails from the caller's point of view: transport or
//! protocol errors come back as a `Failed` patch for that job only.
//! Each probe runs on its own task, so a panicking probe fails only its job.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::record::{JobId, JobPatch};
use super::service::MeetingService;

/// Bounded retry applied before a probe is given up as failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Give up on the first error.
    pub fn fail_fast() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fail_fast()
    }
}

#[derive(Clone)]
pub struct StatusFetcher {
    service: Arc<dyn MeetingService>,
    retry: RetryPolicy,
}

impl StatusFetcher {
    pub fn new(service: Arc<dyn MeetingService>) -> Self {
        Self {
            service,
            retry: RetryPolicy::fail_fast(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Probe one job's status.
    pub async fn fetch_status(&self, id: &JobId) -> JobPatch {
        let mut attempt = 0;
        loop {
            match self.service.meeting_status(id).await {
                Ok(patch) if &patch.id == id => return patch,
                Ok(patch) => {
                    warn!(
                        "Status probe for job {} answered for job {}, marking failed",
                        id, patch.id
                    );
                    return JobPatch::failed(id.clone());
                }
                Err(e) if attempt < self.retry.retries => {
                    let delay = self.retry.delay_for(attempt);
                    debug!(
                        "Status probe for job {} failed (attempt {}): {:#}, retrying in {:?}",
                        id,
                        attempt + 1,
                        e,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    warn!("Status probe for job {} failed: {:#}", id, e);
                    return JobPatch::failed(id.clone());
                }
            }
        }
    }

    /// Probe every id concurrently and wait for all of them.
    ///
    /// Patches come back in the same order as `ids`.
    /// Dropping the returned future aborts every probe still running.
    pub async fn fetch_all(&self, ids: &[JobId]) -> Vec<JobPatch> {
        let mut probes = JoinSet::new();
        for (slot, id) in ids.iter().enumerate() {
            let fetcher = self.clone();
            let id = id.clone();
            probes.spawn(async move { (slot, fetcher.fetch_status(&id).await) });
        }

        let mut patches: Vec<Option<JobPatch>> = vec![None; ids.len()];
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((slot, patch)) => patches[slot] = Some(patch),
                Err(e) => warn!("Status probe task did not finish: {}", e),
            }
        }

        ids.iter()
            .zip(patches)
            .map(|(id, patch)| {
                patch.unwrap_or_else(|| {
                    warn!("No status for job {}, marking failed", id);
                    JobPatch::failed(id.clone())
                })
            })
            .collect()
    }
}
