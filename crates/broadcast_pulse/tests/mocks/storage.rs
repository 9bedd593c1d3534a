use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use broadcast_pulse::media::{SnapshotFile, SnapshotStorage};
use chrono::{DateTime, Utc};

#[derive(Clone, Default)]
pub struct MockSnapshotStorage {
    pub snapshots: Arc<Mutex<HashMap<String, Vec<SnapshotFile>>>>,
    pub audio: Arc<Mutex<HashMap<String, PathBuf>>>,
    pub saved: Arc<Mutex<Vec<(String, DateTime<Utc>)>>>,
    pub fail_with: Arc<Mutex<Option<String>>>,
}

impl MockSnapshotStorage {
    pub fn add_snapshot(&self, external_id: &str, path: &str, captured_at: DateTime<Utc>) {
        self.snapshots
            .lock()
            .unwrap()
            .entry(external_id.to_string())
            .or_default()
            .push(SnapshotFile {
                path: PathBuf::from(path),
                captured_at,
            });
    }

    pub fn set_audio(&self, external_id: &str, path: &str) {
        self.audio
            .lock()
            .unwrap()
            .insert(external_id.to_string(), PathBuf::from(path));
    }

    pub fn set_failing(&self, msg: Option<&str>) {
        *self.fail_with.lock().unwrap() = msg.map(str::to_string);
    }

    fn failure(&self) -> Option<anyhow::Error> {
        self.fail_with
            .lock()
            .unwrap()
            .as_ref()
            .map(|msg| anyhow::anyhow!("{msg}"))
    }
}

impl SnapshotStorage for MockSnapshotStorage {
    async fn save_frame(
        &self,
        _bytes: Vec<u8>,
        external_id: &str,
        captured_at: DateTime<Utc>,
        extension: &str,
    ) -> anyhow::Result<Option<PathBuf>> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        self.saved
            .lock()
            .unwrap()
            .push((external_id.to_string(), captured_at));
        Ok(Some(PathBuf::from(format!(
            "/tmp/mock/{external_id}/{}.{extension}",
            captured_at.timestamp_millis()
        ))))
    }

    async fn snapshots_for(&self, external_id: &str) -> anyhow::Result<Vec<SnapshotFile>> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        let mut snapshots = self
            .snapshots
            .lock()
            .unwrap()
            .get(external_id)
            .cloned()
            .unwrap_or_default();
        snapshots.sort_by_key(|s| s.captured_at);
        Ok(snapshots)
    }

    async fn audio_for(&self, external_id: &str) -> anyhow::Result<Option<PathBuf>> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(self.audio.lock().unwrap().get(external_id).cloned())
    }
}
