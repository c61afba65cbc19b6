//! Tracking of remote meeting-processing jobs.
//!
//! Seeds a local store from one full listing, then polls the status of
//! every unfinished meeting until all of them complete or fail:
//! load → poll → probe (fan-out) → reconcile (fan-in) → commit.

pub mod fetcher;
pub mod loader;
pub mod reconciler;
pub mod record;
pub mod scheduler;
pub mod service;
pub mod store;

pub use fetcher::{RetryPolicy, StatusFetcher};
pub use loader::InitialLoader;
pub use reconciler::{reconcile, Reconciled};
pub use record::{ActionItem, JobId, JobPatch, JobRecord, JobStatus, KeywordCount, MeetingInsights};
pub use scheduler::{PollScheduler, SchedulerHandle, SchedulerState, SchedulerStatus, TrackerView};
pub use service::MeetingService;
pub use store::{JobStore, Snapshot};
