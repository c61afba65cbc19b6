//! Job records and the typed partial updates merged into them.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Opaque identifier of a remote meeting job.
///
/// The meetings API hands out integer ids, but nothing in the tracker
/// depends on that, so both numbers and strings are accepted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for JobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Text(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(id) => JobId::from(id),
            RawId::Text(id) => JobId(id),
        })
    }
}

/// Stage of a meeting-processing pipeline.
///
/// Variants are declared in pipeline order; `Failed` sits outside that
/// order and is reachable from any non-terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Transcribing,
    Analyzing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Transcribing => "transcribing",
            Self::Analyzing => "analyzing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Map a status string reported by the remote service.
    ///
    /// Unknown values map to `Queued` so the job keeps being polled.
    pub fn from_remote(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            debug!("Unrecognized job status '{}', treating as queued", raw);
            Self::Queued
        })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn is_unresolved(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether moving from `self` to `next` is a legal step.
    ///
    /// Staying put is always allowed. Terminal statuses never move.
    pub fn can_advance_to(&self, next: JobStatus) -> bool {
        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match next {
            Self::Failed => true,
            _ => next.pipeline_rank() > self.pipeline_rank(),
        }
    }

    fn pipeline_rank(&self) -> u8 {
        match self {
            Self::Queued => 0,
            Self::Transcribing => 1,
            Self::Analyzing => 2,
            Self::Completed => 3,
            Self::Failed => 3,
        }
    }
}

/// Strict parse of one of the five status names, ignoring case.
impl FromStr for JobStatus {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "queued" => Ok(Self::Queued),
            "transcribing" => Ok(Self::Transcribing),
            "analyzing" => Ok(Self::Analyzing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown status '{}'", raw.trim())),
        }
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(JobStatus::from_remote(&raw))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action item extracted from a meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub task: String,
    pub assigned_to: String,
}

/// How often a keyword was mentioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub keyword: String,
    pub count: u32,
}

/// Analysis results of a completed meeting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeetingInsights {
    pub summary: Option<String>,
    pub transcript: Option<String>,
    pub participants: Vec<String>,
    pub decisions: Vec<String>,
    pub action_items: Vec<ActionItem>,
    pub keywords: Vec<KeywordCount>,
    pub sentiment: Option<String>,
}

impl MeetingInsights {
    pub fn is_empty(&self) -> bool {
        blank(&self.summary)
            && blank(&self.transcript)
            && blank(&self.sentiment)
            && self.participants.is_empty()
            && self.decisions.is_empty()
            && self.action_items.is_empty()
            && self.keywords.is_empty()
    }

    /// Lay `incoming` over `self` field by field.
    ///
    /// Non-empty incoming fields win; empty ones fall back to what we
    /// already had.
    pub fn overlay(self, incoming: MeetingInsights) -> MeetingInsights {
        MeetingInsights {
            summary: pick_text(self.summary, incoming.summary),
            transcript: pick_text(self.transcript, incoming.transcript),
            participants: pick_list(self.participants, incoming.participants),
            decisions: pick_list(self.decisions, incoming.decisions),
            action_items: pick_list(self.action_items, incoming.action_items),
            keywords: pick_list(self.keywords, incoming.keywords),
            sentiment: pick_text(self.sentiment, incoming.sentiment),
        }
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn pick_text(current: Option<String>, incoming: Option<String>) -> Option<String> {
    if blank(&incoming) {
        current
    } else {
        incoming
    }
}

fn pick_list<T>(current: Vec<T>, incoming: Vec<T>) -> Vec<T> {
    if incoming.is_empty() {
        current
    } else {
        incoming
    }
}

/// Locally held state of one meeting job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub display_name: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<MeetingInsights>,
}

impl JobRecord {
    pub fn new(id: impl Into<JobId>, display_name: impl Into<String>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            status,
            insights: None,
        }
    }

    pub fn with_insights(mut self, insights: MeetingInsights) -> Self {
        self.insights = (!insights.is_empty()).then_some(insights);
        self
    }

    pub fn has_insights(&self) -> bool {
        self.insights.as_ref().is_some_and(|i| !i.is_empty())
    }

    /// The patch a full re-fetch of this record would produce.
    pub fn to_patch(&self) -> JobPatch {
        JobPatch {
            id: self.id.clone(),
            status: self.status,
            display_name: Some(self.display_name.clone()),
            insights: self.insights.clone(),
        }
    }
}

/// Partial record produced by a status probe.
///
/// Only `id` and `status` are always present; probes are terse and
/// usually leave the rest out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPatch {
    pub id: JobId,
    pub status: JobStatus,
    pub display_name: Option<String>,
    pub insights: Option<MeetingInsights>,
}

impl JobPatch {
    pub fn status(id: impl Into<JobId>, status: JobStatus) -> Self {
        Self {
            id: id.into(),
            status,
            display_name: None,
            insights: None,
        }
    }

    /// In-band result of a probe that could not reach the remote.
    pub fn failed(id: impl Into<JobId>) -> Self {
        Self::status(id, JobStatus::Failed)
    }

    pub fn with_insights(mut self, insights: MeetingInsights) -> Self {
        self.insights = Some(insights);
        self
    }
}
