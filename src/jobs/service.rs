//! Boundary between the tracker and the remote meetings service.

use anyhow::Result;
use async_trait::async_trait;

use super::record::{JobId, JobPatch, JobRecord};

/// Remote operations the tracker depends on.
///
/// Implemented over HTTP by `MeetingsClient`; tests provide in-memory fakes.
#[async_trait]
pub trait MeetingService: Send + Sync {
    /// Full listing of known meetings, used to seed the store.
    async fn list_meetings(&self) -> Result<Vec<JobRecord>>;

    /// Lightweight status probe for a single meeting. Must be idempotent.
    async fn meeting_status(&self, id: &JobId) -> Result<JobPatch>;
}
