use std::time::Duration;

use broadcast_datastore::{BroadcastJob, ClaimOutcome, JobPatch, JobStore, SummaryStatus};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::{
    correlate::{self, SnapshotHit},
    media::SnapshotStorage,
    ocr::IdentifierOcr,
    stt::Transcriber,
};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Pause between claim+process cycles.
    pub check_interval: Duration,
    /// Claim attempts per job before it is failed for good.
    pub max_retries: i32,
    /// How long a claimed job may sit in `Processing` before the reclaimer
    /// treats its worker as dead.
    pub processing_timeout: chrono::Duration,
    pub language_hint: Option<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            max_retries: 3,
            processing_timeout: chrono::Duration::minutes(15),
            language_hint: None,
        }
    }
}

/// What a single dispatcher cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// No eligible job matched the claim filter.
    Idle,
    /// A job was claimed and its outcome persisted.
    Processed,
    /// A job was claimed but processing hit an unexpected error; it was
    /// returned to the queue or failed per its retry budget.
    JobErrored,
    /// Shutdown fired mid-job; the job went back to `Pending`.
    Cancelled,
}

/// Claims at most one completed capture per cycle for summarization and
/// recovers jobs abandoned by crashed dispatcher instances.
pub struct SummaryDispatcher<S, O, T, F> {
    store: S,
    ocr: O,
    transcriber: T,
    storage: F,
    config: DispatcherConfig,
}

impl<S, O, T, F> SummaryDispatcher<S, O, T, F>
where
    S: JobStore + Send + Sync + 'static,
    O: IdentifierOcr + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
    F: SnapshotStorage + Send + Sync + 'static,
{
    pub fn new(store: S, ocr: O, transcriber: T, storage: F, config: DispatcherConfig) -> Self {
        Self {
            store,
            ocr,
            transcriber,
            storage,
            config,
        }
    }

    pub async fn run(&self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.config.check_interval) => {}
            }
            match self.run_cycle(&shutdown).await {
                Ok(CycleOutcome::Cancelled) => break,
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Dispatcher cycle failed"),
            }
            if let Err(e) = self.reclaim_stuck_jobs().await {
                tracing::error!(error = ?e, "Stuck-job reclaim failed");
            }
        }
        tracing::info!("Summary dispatcher stopped");
    }

    /// One claim+process cycle. An empty claim is a normal outcome and
    /// simply defers to the next cycle.
    pub async fn run_cycle(&self, shutdown: &CancellationToken) -> anyhow::Result<CycleOutcome> {
        let claimed = match self
            .store
            .claim_next_summary_job(self.config.max_retries, Utc::now())
            .await?
        {
            ClaimOutcome::NoneAvailable => return Ok(CycleOutcome::Idle),
            ClaimOutcome::Claimed(job) => *job,
        };
        tracing::info!(
            external_id = %claimed.external_id,
            attempt = claimed.summary_retry_count,
            "Claimed summarization job"
        );

        tokio::select! {
            _ = shutdown.cancelled() => {
                // Shutdown is not a processing failure: the job goes back to
                // the queue with the retry counter untouched.
                let patch = JobPatch {
                    summary_status: Some(SummaryStatus::Pending),
                    summary_error: Some("summarization interrupted by shutdown".into()),
                    ..Default::default()
                };
                if let Err(e) = self.store.update_job(claimed.id, patch).await {
                    tracing::error!(error = ?e, job_id = claimed.id, "Failed to release job during shutdown");
                }
                Ok(CycleOutcome::Cancelled)
            }
            result = self.process_job(&claimed) => match result {
                Ok(status) => {
                    tracing::info!(external_id = %claimed.external_id, ?status, "Summarization finished");
                    Ok(CycleOutcome::Processed)
                }
                Err(e) => {
                    // The claim already consumed this attempt's retry; decide
                    // the job's fate from the post-claim counter.
                    let status = if claimed.summary_retry_count < self.config.max_retries {
                        SummaryStatus::Pending
                    } else {
                        SummaryStatus::Failed
                    };
                    tracing::error!(
                        error = ?e,
                        external_id = %claimed.external_id,
                        ?status,
                        "Summarization attempt failed"
                    );
                    let patch = JobPatch {
                        summary_status: Some(status),
                        summary_error: Some(format!("summarization attempt failed: {e:#}")),
                        ..Default::default()
                    };
                    if let Err(update_err) = self.store.update_job(claimed.id, patch).await {
                        tracing::error!(error = ?update_err, job_id = claimed.id, "Failed to persist attempt failure");
                    }
                    Ok(CycleOutcome::JobErrored)
                }
            }
        }
    }

    /// OCR every persisted snapshot, transcribe the audio artifact, build
    /// judged windows and persist everything in one update.
    #[tracing::instrument(skip_all, fields(external_id = %job.external_id))]
    async fn process_job(&self, job: &BroadcastJob) -> anyhow::Result<SummaryStatus> {
        let snapshots = self.storage.snapshots_for(&job.external_id).await?;
        let anchor = job.anchor_time();

        let mut hits: Vec<SnapshotHit> = Vec::new();
        for snapshot in &snapshots {
            match self.ocr.extract_identifiers(snapshot.path.clone()).await {
                Ok(identifiers) => {
                    let offset = correlate::offset_seconds(anchor, snapshot.captured_at);
                    hits.extend(identifiers.into_iter().map(|identifier| SnapshotHit {
                        identifier,
                        offset,
                    }));
                }
                Err(e) => {
                    tracing::warn!(error = ?e, path = %snapshot.path.display(), "OCR failed on snapshot; skipping")
                }
            }
        }

        let transcription = match self.storage.audio_for(&job.external_id).await? {
            Some(audio_path) => match self
                .transcriber
                .transcribe(audio_path, self.config.language_hint.clone())
                .await
            {
                Ok(resp) => {
                    tracing::info!(duration = resp.duration, "Transcription succeeded");
                    Some(resp)
                }
                Err(e) => {
                    tracing::warn!(error = ?e, "Transcription failed");
                    None
                }
            },
            None => {
                tracing::warn!("No audio artifact found for job");
                None
            }
        };

        let windows = match &transcription {
            Some(resp) if !hits.is_empty() => {
                correlate::correlate(&hits, resp.segments.as_deref().unwrap_or(&[]))
            }
            _ => Vec::new(),
        };

        let (status, note) = match (&transcription, !hits.is_empty()) {
            (Some(_), true) => (SummaryStatus::Completed, None),
            (Some(_), false) if snapshots.is_empty() => (SummaryStatus::Completed, None),
            (Some(_), false) => (
                SummaryStatus::Completed,
                Some("no process identifiers found in snapshots".to_string()),
            ),
            (None, true) => (
                SummaryStatus::Failed,
                Some("transcription failed but snapshots contained identifiers".to_string()),
            ),
            (None, false) => (SummaryStatus::Failed, Some("transcription failed".to_string())),
        };

        let updated = self
            .store
            .update_job(
                job.id,
                JobPatch {
                    summary_status: Some(status),
                    transcript_text: transcription.map(|t| t.text),
                    judged_windows: Some(windows),
                    summary_error: note,
                    ..Default::default()
                },
            )
            .await?;
        if !updated {
            tracing::warn!(job_id = job.id, "Job vanished before summary update");
        }
        Ok(status)
    }

    /// Recovers jobs left in `Processing` past the timeout by a crashed or
    /// hung worker. Idempotent: once reclaimed, a job's status no longer
    /// matches the stuck query.
    #[tracing::instrument(skip(self))]
    pub async fn reclaim_stuck_jobs(&self) -> anyhow::Result<usize> {
        let cutoff = Utc::now() - self.config.processing_timeout;
        let stuck = self.store.find_stuck_jobs(cutoff).await?;

        let mut reclaimed = 0;
        for job in stuck {
            let retries = job.summary_retry_count + 1;
            // A reclaimed job only goes back to Pending if the claim filter
            // would still accept it; otherwise it would sit unclaimable forever.
            let status = if retries < self.config.max_retries {
                SummaryStatus::Pending
            } else {
                SummaryStatus::Failed
            };
            tracing::warn!(
                external_id = %job.external_id,
                retries,
                ?status,
                "Reclaiming job stuck in processing"
            );
            let patch = JobPatch {
                summary_status: Some(status),
                summary_retry_count: Some(retries),
                summary_error: Some(format!(
                    "reclaimed after processing exceeded {}s",
                    self.config.processing_timeout.num_seconds()
                )),
                ..Default::default()
            };
            if self.store.update_job(job.id, patch).await? {
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }
}
