//! One-shot load of every known meeting, used to seed the store.

use std::sync::Arc;
use tracing::{error, info};

use super::record::JobRecord;
use super::service::MeetingService;
use crate::error::{TrackerError, TrackerResult};

pub struct InitialLoader {
    service: Arc<dyn MeetingService>,
}

impl InitialLoader {
    pub fn new(service: Arc<dyn MeetingService>) -> Self {
        Self { service }
    }

    /// Fetch the full collection.
    ///
    /// Unlike status probes there is nothing sensible to fall back to,
    /// so failures are returned to the caller.
    pub async fn load_all(&self) -> TrackerResult<Vec<JobRecord>> {
        match self.service.list_meetings().await {
            Ok(records) => {
                let unresolved = records.iter().filter(|r| r.status.is_unresolved()).count();
                info!(
                    "Loaded {} meetings ({} still processing)",
                    records.len(),
                    unresolved
                );
                Ok(records)
            }
            Err(e) => {
                error!("Initial meeting load failed: {:#}", e);
                Err(TrackerError::InitialLoad(e))
            }
        }
    }
}
