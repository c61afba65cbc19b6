//! In-memory store of tracked jobs.
//!
//! The store is owned by the poll scheduler's task; everything else sees it
//! through whole snapshots published on a watch channel.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

use super::record::{JobId, JobRecord};

pub type Snapshot = Arc<[JobRecord]>;

pub struct JobStore {
    records: Snapshot,
    tx: watch::Sender<Snapshot>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore {
    pub fn new() -> Self {
        let records: Snapshot = Arc::from(Vec::new());
        let (tx, _rx) = watch::channel(records.clone());
        Self { records, tx }
    }

    /// Read-only view of the current records, in display order.
    pub fn snapshot(&self) -> Snapshot {
        self.records.clone()
    }

    /// Observe every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    /// Establish the baseline from a full load. Repeated ids keep the
    /// first occurrence.
    pub fn replace_all(&mut self, records: Vec<JobRecord>) {
        let mut seen = HashSet::with_capacity(records.len());
        let unique: Vec<JobRecord> = records
            .into_iter()
            .filter(|record| seen.insert(record.id.clone()))
            .collect();
        self.publish(unique);
    }

    /// Swap in the next generation produced by reconciliation.
    pub fn commit(&mut self, next: Vec<JobRecord>) {
        self.publish(next);
    }

    /// Append a newly submitted job. Returns false if the id is already tracked.
    pub fn insert(&mut self, record: JobRecord) -> bool {
        if self.contains(&record.id) {
            return false;
        }
        let mut next = self.records.to_vec();
        next.push(record);
        self.publish(next);
        true
    }

    pub fn contains(&self, id: &JobId) -> bool {
        self.records.iter().any(|record| &record.id == id)
    }

    /// Ids of jobs that are not yet completed or failed.
    pub fn unresolved_ids(&self) -> Vec<JobId> {
        self.records
            .iter()
            .filter(|record| record.status.is_unresolved())
            .map(|record| record.id.clone())
            .collect()
    }

    pub fn has_unresolved(&self) -> bool {
        self.records.iter().any(|record| record.status.is_unresolved())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn publish(&mut self, next: Vec<JobRecord>) {
        self.records = Arc::from(next);
        self.tx.send_replace(self.records.clone());
    }
}
