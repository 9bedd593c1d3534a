pub mod ffmpeg;
pub mod fs_storage;

use std::{future::Future, path::PathBuf, time::Duration};

use chrono::{DateTime, Utc};

/// Grabs frames and audio out of broadcast media. A `None` return means the
/// tool produced no data; callers treat that as a skipped attempt, not a
/// fatal error.
///
/// `capture_frame` serves the live capture loop. `capture_frame_at` and
/// `extract_audio` serve recorded-media ingestion, where an external step
/// walks a job's `local_media_path` and backfills snapshots and audio.
pub trait FrameCapture {
    fn capture_frame(
        &self,
        locator: &str,
    ) -> impl Future<Output = anyhow::Result<Option<Vec<u8>>>> + Send;

    fn capture_frame_at(
        &self,
        file: PathBuf,
        offset: Duration,
    ) -> impl Future<Output = anyhow::Result<Option<Vec<u8>>>> + Send;

    fn extract_audio(
        &self,
        file: PathBuf,
        out_dir: PathBuf,
    ) -> impl Future<Output = anyhow::Result<Option<PathBuf>>> + Send;
}

/// A persisted snapshot with the capture time recovered from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotFile {
    pub path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

/// Persists captured frames and resolves the artifacts the dispatcher
/// reads back per job.
pub trait SnapshotStorage {
    fn save_frame(
        &self,
        bytes: Vec<u8>,
        external_id: &str,
        captured_at: DateTime<Utc>,
        extension: &str,
    ) -> impl Future<Output = anyhow::Result<Option<PathBuf>>> + Send;

    /// All persisted snapshots for a job, ascending by capture time.
    fn snapshots_for(
        &self,
        external_id: &str,
    ) -> impl Future<Output = anyhow::Result<Vec<SnapshotFile>>> + Send;

    /// The job's audio artifact, if one was persisted. Audio comes from
    /// recorded-media ingestion (`FrameCapture::extract_audio` over the
    /// job's `local_media_path`), never from the live capture loop, so a
    /// live-only job can legitimately have none.
    fn audio_for(
        &self,
        external_id: &str,
    ) -> impl Future<Output = anyhow::Result<Option<PathBuf>>> + Send;
}
