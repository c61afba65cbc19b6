use thiserror::Error;

/// Failures of the tracker as a whole.
///
/// Per-job probe failures never show up here; they are folded into the
/// job's record as a `Failed` status.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Failed to load meetings: {0:#}")]
    InitialLoad(anyhow::Error),

    #[error("Poll scheduler stopped unexpectedly: {0}")]
    Scheduler(String),

    #[error("Poll scheduler is no longer running")]
    SchedulerStopped,
}

pub type TrackerResult<T> = Result<T, TrackerError>;
