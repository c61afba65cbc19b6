//! HTTP client for the meeting-intelligence API.
//!
//! Provides methods for listing meetings, polling a meeting's status,
//! fetching full results, uploading recordings and asking questions
//! about a processed meeting.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

use crate::jobs::{
    ActionItem, JobId, JobPatch, JobRecord, JobStatus, KeywordCount, MeetingInsights,
    MeetingService,
};

/// Client for interacting with the meetings API.
pub struct MeetingsClient {
    client: reqwest::Client,
    base_url: String,
    list_limit: usize,
}

/// Lightweight status response for polling, also returned by uploads.
#[derive(Debug, Deserialize)]
pub struct MeetingStatusResponse {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Full meeting details including analysis results.
///
/// List fields may arrive either as arrays or as JSON-encoded strings;
/// anything undecodable is treated as empty.
#[derive(Debug, Deserialize)]
pub struct MeetingResponse {
    pub id: JobId,
    #[serde(default)]
    pub filename: String,
    pub status: JobStatus,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub action_items: Vec<ActionItem>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub decisions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub keywords: Vec<KeywordCount>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub participants: Vec<String>,
    #[serde(default)]
    pub sentiment: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    answer: String,
}

/// Error body returned by the API on failures.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    detail: Value,
}

impl MeetingStatusResponse {
    pub fn into_patch(self) -> JobPatch {
        JobPatch {
            id: self.id,
            status: self.status,
            display_name: self.filename,
            insights: None,
        }
    }

    pub fn into_record(self) -> JobRecord {
        JobRecord::new(self.id, self.filename.unwrap_or_default(), self.status)
    }
}

impl MeetingResponse {
    pub fn into_record(self) -> JobRecord {
        let insights = MeetingInsights {
            summary: self.summary,
            transcript: self.transcript,
            participants: self.participants,
            decisions: self.decisions,
            action_items: self.action_items,
            keywords: self.keywords,
            sentiment: self.sentiment,
        };

        let record = JobRecord::new(self.id, self.filename, self.status);
        if record.status == JobStatus::Completed {
            record.with_insights(insights)
        } else {
            record
        }
    }
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(raw)) => serde_json::from_str(&raw).unwrap_or_default(),
        Some(other) => serde_json::from_value(other).unwrap_or_default(),
    })
}

/// MIME type for a recording's file extension, if it is one the API accepts.
pub fn mime_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "wav" => Some("audio/wav"),
        "mp3" => Some("audio/mpeg"),
        "m4a" => Some("audio/mp4"),
        "flac" => Some("audio/flac"),
        "ogg" => Some("audio/ogg"),
        "opus" => Some("audio/opus"),
        "mp4" => Some("video/mp4"),
        "mkv" => Some("video/x-matroska"),
        "webm" => Some("video/webm"),
        "avi" => Some("video/x-msvideo"),
        "mov" => Some("video/quicktime"),
        _ => None,
    }
}

impl MeetingsClient {
    /// Create a new client with the given base URL.
    pub fn new(base_url: &str, timeout: Duration, list_limit: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            list_limit,
        })
    }

    /// List meetings, newest first.
    pub async fn list(&self, skip: usize, limit: usize) -> Result<Vec<JobRecord>> {
        let url = format!("{}/meetings", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("skip", skip), ("limit", limit)])
            .send()
            .await
            .context("Failed to list meetings")?;

        let meetings: Vec<MeetingResponse> = read_json(response, "list meetings").await?;
        Ok(meetings.into_iter().map(MeetingResponse::into_record).collect())
    }

    /// Get meeting status (lightweight polling endpoint).
    pub async fn status(&self, id: &JobId) -> Result<JobPatch> {
        let url = format!("{}/meetings/{}/status", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to get meeting status")?;

        let status: MeetingStatusResponse = read_json(response, "get status").await?;
        Ok(status.into_patch())
    }

    /// Get full meeting details including analysis results.
    pub async fn meeting(&self, id: &JobId) -> Result<JobRecord> {
        let url = format!("{}/meetings/{}", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to get meeting")?;

        let meeting: MeetingResponse = read_json(response, "get meeting").await?;
        Ok(meeting.into_record())
    }

    /// Upload a recording for processing, returns the newly queued meeting.
    pub async fn upload(&self, file_path: &Path) -> Result<JobRecord> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let mime_type = mime_type_for_extension(ext)
            .ok_or_else(|| anyhow!("Unsupported format: .{}", ext))?;

        let file_data = fs::read(file_path).await.context("Failed to read file")?;

        let filename = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("recording")
            .to_string();

        debug!(
            "Uploading {} ({} bytes, {})",
            filename,
            file_data.len(),
            mime_type
        );

        let form = Form::new().part(
            "file",
            Part::bytes(file_data)
                .file_name(filename)
                .mime_str(mime_type)?,
        );

        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .context("Failed to upload recording")?;

        let ack: MeetingStatusResponse = read_json(response, "upload recording").await?;
        Ok(ack.into_record())
    }

    /// Ask a question about a processed meeting.
    pub async fn ask(&self, id: &JobId, query: &str) -> Result<String> {
        let url = format!("{}/search/{}", self.base_url, id);

        let response = self
            .client
            .post(&url)
            .json(&SearchRequest { query })
            .send()
            .await
            .context("Failed to search meeting")?;

        let result: SearchResponse = read_json(response, "search meeting").await?;
        Ok(result.answer)
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, action: &str) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        bail!("Failed to {} ({}): {}", action, status, error_message(status, &body));
    }

    serde_json::from_str(&body).with_context(|| format!("Failed to parse {} response", action))
}

fn error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            detail: Value::String(detail),
        }) => detail,
        Ok(ErrorResponse { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string(),
        Err(_) => body.to_string(),
    }
}

#[async_trait]
impl MeetingService for MeetingsClient {
    async fn list_meetings(&self) -> Result<Vec<JobRecord>> {
        self.list(0, self.list_limit).await
    }

    /// Status probe; the first time a meeting is seen completed its
    /// results are fetched as well, since the status endpoint omits them.
    async fn meeting_status(&self, id: &JobId) -> Result<JobPatch> {
        let patch = self.status(id).await?;
        if patch.status != JobStatus::Completed {
            return Ok(patch);
        }

        match self.meeting(id).await {
            Ok(JobRecord {
                insights: Some(insights),
                ..
            }) => Ok(patch.with_insights(insights)),
            Ok(_) => Ok(patch),
            Err(e) => {
                warn!(
                    "Meeting {} completed but its results could not be fetched: {:#}",
                    id, e
                );
                Ok(patch)
            }
        }
    }
}
