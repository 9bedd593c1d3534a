use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JobPatch;

/// Acquisition state of the snapshot/audio capture phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl CaptureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureStatus::Pending => "pending",
            CaptureStatus::Processing => "processing",
            CaptureStatus::Completed => "completed",
            CaptureStatus::Failed => "failed",
        }
    }
}

impl FromStr for CaptureStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CaptureStatus::Pending),
            "processing" => Ok(CaptureStatus::Processing),
            "completed" => Ok(CaptureStatus::Completed),
            "failed" => Ok(CaptureStatus::Failed),
            other => Err(anyhow::anyhow!("unknown capture status: {other}")),
        }
    }
}

/// State of the summarization phase. Absent on jobs that have never been
/// picked up by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Pending => "pending",
            SummaryStatus::Processing => "processing",
            SummaryStatus::Completed => "completed",
            SummaryStatus::Failed => "failed",
        }
    }
}

impl FromStr for SummaryStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SummaryStatus::Pending),
            "processing" => Ok(SummaryStatus::Processing),
            "completed" => Ok(SummaryStatus::Completed),
            "failed" => Ok(SummaryStatus::Failed),
            other => Err(anyhow::anyhow!("unknown summary status: {other}")),
        }
    }
}

/// The computed time range and transcript snippet for one process
/// identifier found via OCR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgedWindow {
    pub identifier: String,
    /// Seconds from the broadcast anchor time to the earliest sighting.
    pub start_offset: f64,
    /// Seconds from the broadcast anchor time to the latest sighting.
    pub end_offset: f64,
    pub snippet: String,
}

/// One monitored broadcast's (or uploaded file's) unit of capture and
/// summarization work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastJob {
    pub id: i64,
    /// Platform video id; keys the supervisor's in-memory worker registry.
    pub external_id: String,
    pub title: Option<String>,
    /// Playable locator for live frame capture.
    pub stream_url: Option<String>,
    /// Set for file-based ingestion instead of a live locator.
    pub local_media_path: Option<String>,
    pub is_live_now: bool,
    pub capture_status: CaptureStatus,
    pub summary_status: Option<SummaryStatus>,
    pub summary_retry_count: i32,
    /// Set by the atomic claim; the reclaimer uses it to detect stuck jobs.
    pub summary_started_at: Option<DateTime<Utc>>,
    pub summary_error: Option<String>,
    pub transcript_text: Option<String>,
    pub judged_windows: Vec<JudgedWindow>,
    /// Broadcast start (or upload time); claim ordering key and the anchor
    /// against which snapshot capture times become relative offsets.
    pub started_at: DateTime<Utc>,
}

impl BroadcastJob {
    /// Whether the dispatcher's atomic claim filter would match this job.
    pub fn is_summary_eligible(&self, max_retries: i32) -> bool {
        self.capture_status == CaptureStatus::Completed
            && matches!(self.summary_status, None | Some(SummaryStatus::Pending))
            && self.summary_retry_count < max_retries
    }

    /// Reference time for converting snapshot capture times to offsets.
    pub fn anchor_time(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Applies a patch in-memory, mirroring what `update_job` persists.
    pub fn apply(&mut self, patch: &JobPatch) {
        if let Some(status) = patch.capture_status {
            self.capture_status = status;
        }
        if let Some(status) = patch.summary_status {
            self.summary_status = Some(status);
        }
        if let Some(count) = patch.summary_retry_count {
            self.summary_retry_count = count;
        }
        if let Some(ref message) = patch.summary_error {
            self.summary_error = Some(message.clone());
        }
        if let Some(ref text) = patch.transcript_text {
            self.transcript_text = Some(text.clone());
        }
        if let Some(ref windows) = patch.judged_windows {
            self.judged_windows = windows.clone();
        }
        if let Some(live) = patch.is_live_now {
            self.is_live_now = live;
        }
    }
}
