use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::media::{SnapshotFile, SnapshotStorage};

/// Workdir-backed snapshot and audio layout:
/// `<root>/snapshots/<external_id>/<millis>.<ext>` and
/// `<root>/audio/<external_id>.mp3`. The capture timestamp is encoded in
/// the snapshot file stem so the dispatcher can recover it without any
/// store round-trip.
#[derive(Debug, Clone)]
pub struct FsSnapshotStorage {
    root: PathBuf,
}

impl FsSnapshotStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn snapshot_dir(&self, external_id: &str) -> PathBuf {
        self.root.join("snapshots").join(external_id)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join("audio")
    }

    fn captured_at_from_stem(path: &Path) -> Option<DateTime<Utc>> {
        let stem = path.file_stem()?.to_str()?;
        let millis = stem.parse::<i64>().ok()?;
        DateTime::from_timestamp_millis(millis)
    }
}

impl SnapshotStorage for FsSnapshotStorage {
    async fn save_frame(
        &self,
        bytes: Vec<u8>,
        external_id: &str,
        captured_at: DateTime<Utc>,
        extension: &str,
    ) -> anyhow::Result<Option<PathBuf>> {
        let dir = self.snapshot_dir(external_id);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{}.{extension}", captured_at.timestamp_millis()));
        tokio::fs::write(&path, bytes).await?;
        Ok(Some(path))
    }

    async fn snapshots_for(&self, external_id: &str) -> anyhow::Result<Vec<SnapshotFile>> {
        let dir = self.snapshot_dir(external_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut snapshots = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            match Self::captured_at_from_stem(&path) {
                Some(captured_at) => snapshots.push(SnapshotFile { path, captured_at }),
                None => {
                    tracing::warn!(path = %path.display(), "Skipping snapshot with unparseable name")
                }
            }
        }
        snapshots.sort_by_key(|s| s.captured_at);
        Ok(snapshots)
    }

    async fn audio_for(&self, external_id: &str) -> anyhow::Result<Option<PathBuf>> {
        let path = self.audio_dir().join(format!("{external_id}.mp3"));
        Ok(path.exists().then_some(path))
    }
}
