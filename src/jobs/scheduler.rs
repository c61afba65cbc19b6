//! Poll scheduler: drives status probes while any job is still processing.
//!
//! A single task owns the [`JobStore`]. While the store holds unresolved
//! jobs it ticks on a fixed interval; each tick probes every unresolved job
//! concurrently, waits for all probes, reconciles and commits once. With
//! nothing left to poll the timer is dropped and the task sleeps until a new
//! job is tracked or the scheduler is stopped.
//!
//! ```ignore
//! let handle = PollScheduler::new(fetcher, Duration::from_secs(5))
//!     .with_records(loader.load_all().await?)
//!     .spawn();
//!
//! let mut updates = handle.subscribe();
//! // ...
//! handle.stop().await?;
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::fetcher::StatusFetcher;
use super::reconciler::reconcile;
use super::record::JobRecord;
use super::store::{JobStore, Snapshot};
use crate::error::{TrackerError, TrackerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    /// No timer running; nothing to poll.
    Idle,
    /// Timer running, a tick pending or in flight.
    Active,
    /// Torn down; no further ticks will run.
    Stopped,
}

/// Observable state of the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStatus {
    pub state: SchedulerState,
    pub ticks: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub tracked: usize,
    pub unresolved: usize,
    #[serde(skip)]
    commands_applied: u64,
}

/// Owns the status sender for the scheduler task and reports `Stopped`
/// however the task ends, including a panic or an abort.
struct StatusGuard(watch::Sender<SchedulerStatus>);

impl Deref for StatusGuard {
    type Target = watch::Sender<SchedulerStatus>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Drop for StatusGuard {
    fn drop(&mut self) {
        self.0.send_if_modified(|s| {
            let modified = s.state != SchedulerState::Stopped;
            s.state = SchedulerState::Stopped;
            modified
        });
    }
}

enum Command {
    Track(JobRecord),
    ReplaceAll(Vec<JobRecord>),
}

pub struct PollScheduler {
    store: JobStore,
    fetcher: StatusFetcher,
    interval: Duration,
}

impl PollScheduler {
    pub fn new(fetcher: StatusFetcher, interval: Duration) -> Self {
        Self {
            store: JobStore::new(),
            fetcher,
            interval,
        }
    }

    /// Seed the store before the scheduler starts.
    pub fn with_records(mut self, records: Vec<JobRecord>) -> Self {
        self.store.replace_all(records);
        self
    }

    /// Move the scheduler onto its own task.
    pub fn spawn(self) -> SchedulerHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SchedulerStatus {
            state: if self.store.has_unresolved() {
                SchedulerState::Active
            } else {
                SchedulerState::Idle
            },
            ticks: 0,
            last_tick_at: None,
            tracked: self.store.len(),
            unresolved: self.store.unresolved_ids().len(),
            commands_applied: 0,
        });
        let snapshots = self.store.subscribe();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(self.run(cmd_rx, status_tx, cancel.clone()));

        SchedulerHandle {
            commands: cmd_tx,
            commands_sent: AtomicU64::new(0),
            view: TrackerView {
                snapshots,
                status: status_rx,
            },
            cancel,
            task: Some(task),
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        status: watch::Sender<SchedulerStatus>,
        cancel: CancellationToken,
    ) {
        let status = StatusGuard(status);
        info!(
            "Poll scheduler started ({} meetings, interval {:?})",
            self.store.len(),
            self.interval
        );

        'lifecycle: loop {
            if !self.store.has_unresolved() {
                self.publish(&status, SchedulerState::Idle);
                debug!("No meetings processing, poller idle");

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'lifecycle,
                    command = commands.recv() => match command {
                        Some(command) => self.apply(command, &status),
                        None => break 'lifecycle,
                    },
                }
                continue 'lifecycle;
            }

            self.publish(&status, SchedulerState::Active);
            debug!("Meetings processing, poller active");

            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break 'lifecycle,
                    command = commands.recv() => match command {
                        Some(command) => {
                            self.apply(command, &status);
                            continue;
                        }
                        None => break 'lifecycle,
                    },
                    _ = ticker.tick() => {}
                }

                // Checked before any probe goes out.
                let ids = self.store.unresolved_ids();
                if ids.is_empty() {
                    continue 'lifecycle;
                }

                debug!("Polling status of {} meetings", ids.len());
                let patches = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("Scheduler stopped mid-tick, discarding probes");
                        break 'lifecycle;
                    }
                    patches = self.fetcher.fetch_all(&ids) => patches,
                };

                if cancel.is_cancelled() {
                    break 'lifecycle;
                }

                let reconciled = reconcile(&self.store.snapshot(), &patches);
                if reconciled.changed {
                    self.store.commit(reconciled.records);
                }
                status.send_modify(|s| {
                    s.ticks += 1;
                    s.last_tick_at = Some(Utc::now());
                });

                if !self.store.has_unresolved() {
                    info!("All meetings finished processing");
                    continue 'lifecycle;
                }
            }
        }

        self.publish(&status, SchedulerState::Stopped);
        info!("Poll scheduler stopped");
    }

    fn apply(&mut self, command: Command, status: &watch::Sender<SchedulerStatus>) {
        match command {
            Command::Track(record) => {
                let id = record.id.clone();
                if self.store.insert(record) {
                    info!("Tracking new meeting {}", id);
                } else {
                    warn!("Meeting {} is already tracked", id);
                }
            }
            Command::ReplaceAll(records) => {
                info!("Reloading tracker with {} meetings", records.len());
                self.store.replace_all(records);
            }
        }
        // Activation must be visible before the command counts as applied.
        let state = if self.store.has_unresolved() {
            SchedulerState::Active
        } else {
            status.borrow().state
        };
        self.publish(status, state);
        status.send_modify(|s| s.commands_applied += 1);
    }

    fn publish(&self, status: &watch::Sender<SchedulerStatus>, state: SchedulerState) {
        let tracked = self.store.len();
        let unresolved = self.store.unresolved_ids().len();
        status.send_if_modified(|s| {
            let modified = s.state != state || s.tracked != tracked || s.unresolved != unresolved;
            s.state = state;
            s.tracked = tracked;
            s.unresolved = unresolved;
            modified
        });
    }
}

/// Read-only view of a running tracker, cheap to clone.
#[derive(Clone)]
pub struct TrackerView {
    snapshots: watch::Receiver<Snapshot>,
    status: watch::Receiver<SchedulerStatus>,
}

impl TrackerView {
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn status(&self) -> SchedulerStatus {
        self.status.borrow().clone()
    }

    /// Receiver notified on every committed change to the records.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn status_updates(&self) -> watch::Receiver<SchedulerStatus> {
        self.status.clone()
    }
}

/// Owner's handle on a spawned scheduler. Dropping it stops the scheduler.
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<Command>,
    commands_sent: AtomicU64,
    view: TrackerView,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn view(&self) -> TrackerView {
        self.view.clone()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.view.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.view.subscribe()
    }

    pub fn state(&self) -> SchedulerState {
        match &self.task {
            Some(task) if !task.is_finished() => self.view.status().state,
            _ => SchedulerState::Stopped,
        }
    }

    /// Start tracking a job the remote just acknowledged.
    pub fn track(&self, record: JobRecord) -> TrackerResult<()> {
        self.send(Command::Track(record))
    }

    /// Replace every tracked job, e.g. after a full reload.
    pub fn replace_all(&self, records: Vec<JobRecord>) -> TrackerResult<()> {
        self.send(Command::ReplaceAll(records))
    }

    /// Wait until every sent command is applied and nothing is left to poll.
    pub async fn wait_idle(&self) -> TrackerResult<()> {
        let sent = self.commands_sent.load(Ordering::SeqCst);
        let mut status = self.view.status_updates();
        let result = status
            .wait_for(|s| {
                s.commands_applied >= sent
                    && matches!(s.state, SchedulerState::Idle | SchedulerState::Stopped)
            })
            .await;

        match result {
            Ok(s) if s.state == SchedulerState::Idle => Ok(()),
            _ => Err(TrackerError::SchedulerStopped),
        }
    }

    /// Stop the timer and wait for the scheduler task to exit.
    ///
    /// A tick still waiting on probes is discarded without committing.
    pub async fn stop(mut self) -> TrackerResult<()> {
        self.cancel.cancel();
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        match task.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(TrackerError::Scheduler(e.to_string())),
        }
    }

    fn send(&self, command: Command) -> TrackerResult<()> {
        self.commands
            .send(command)
            .map_err(|_| TrackerError::SchedulerStopped)?;
        self.commands_sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
