//! Tracked meeting endpoints.
//!
//! Provides HTTP endpoints for:
//! - Listing tracked meetings (GET /meetings)
//! - Getting a tracked meeting (GET /meetings/:id)
//! - Getting poller status (GET /scheduler)

use crate::api::error::{ApiError, ApiResult};
use crate::jobs::{JobId, JobRecord, JobStatus, SchedulerStatus, TrackerView};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

/// Query parameters for listing meetings.
#[derive(Debug, Deserialize, Default)]
pub struct MeetingsQueryParams {
    /// Only meetings in this status
    pub status: Option<String>,
}

pub fn router(view: TrackerView) -> Router {
    Router::new()
        .route("/meetings", get(list_meetings))
        .route("/meetings/:id", get(get_meeting))
        .route("/scheduler", get(scheduler_status))
        .with_state(view)
}

/// GET /meetings - Current snapshot of tracked meetings.
async fn list_meetings(
    State(view): State<TrackerView>,
    Query(params): Query<MeetingsQueryParams>,
) -> ApiResult<Json<Vec<JobRecord>>> {
    let wanted = params
        .status
        .as_deref()
        .map(str::parse::<JobStatus>)
        .transpose()
        .map_err(ApiError::bad_request)?;
    let meetings = view
        .snapshot()
        .iter()
        .filter(|record| wanted.map_or(true, |status| record.status == status))
        .cloned()
        .collect();

    Ok(Json(meetings))
}

/// GET /meetings/:id - A single tracked meeting.
async fn get_meeting(
    State(view): State<TrackerView>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobRecord>> {
    let id = JobId::new(id);
    view.snapshot()
        .iter()
        .find(|record| record.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Meeting {} is not tracked", id)))
}

/// GET /scheduler - Poller state and tick counters.
async fn scheduler_status(State(view): State<TrackerView>) -> Json<SchedulerStatus> {
    Json(view.status())
}
