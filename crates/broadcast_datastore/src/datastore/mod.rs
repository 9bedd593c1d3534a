use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{BroadcastJob, CaptureStatus, JudgedWindow, SummaryStatus};

pub mod postgres;

/// Single-document patch applied by [`JobStore::update_job`]. Unset fields
/// are left untouched in the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub capture_status: Option<CaptureStatus>,
    pub summary_status: Option<SummaryStatus>,
    pub summary_retry_count: Option<i32>,
    pub summary_error: Option<String>,
    pub transcript_text: Option<String>,
    pub judged_windows: Option<Vec<JudgedWindow>>,
    pub is_live_now: Option<bool>,
}

impl JobPatch {
    pub fn is_empty(&self) -> bool {
        *self == JobPatch::default()
    }
}

/// Result of one atomic claim attempt. A store failure travels through the
/// surrounding `Result`; an empty match is a normal outcome, not an error.
#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed(Box<BroadcastJob>),
    NoneAvailable,
}

pub trait JobStore {
    /// Jobs currently flagged live with a usable external id and locator.
    fn find_live_jobs(&self) -> impl Future<Output = anyhow::Result<Vec<BroadcastJob>>> + Send;

    fn find_job(
        &self,
        external_id: &str,
    ) -> impl Future<Output = anyhow::Result<Option<BroadcastJob>>> + Send;

    /// Jobs claimed for summarization before `cutoff` that never finished.
    fn find_stuck_jobs(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = anyhow::Result<Vec<BroadcastJob>>> + Send;

    /// Returns false if no job with `id` exists.
    fn update_job(
        &self,
        id: i64,
        patch: JobPatch,
    ) -> impl Future<Output = anyhow::Result<bool>> + Send;

    /// Atomically claims the oldest eligible job: capture completed, summary
    /// pending or unset, retry count below `max_retries`. On match the job
    /// moves to `Processing`, `summary_started_at` is set to `now` and the
    /// retry count is incremented, all in one find-and-modify.
    fn claim_next_summary_job(
        &self,
        max_retries: i32,
        now: DateTime<Utc>,
    ) -> impl Future<Output = anyhow::Result<ClaimOutcome>> + Send;
}

impl<T: JobStore + Send + Sync> JobStore for &T {
    async fn find_live_jobs(&self) -> anyhow::Result<Vec<BroadcastJob>> {
        (**self).find_live_jobs().await
    }

    async fn find_job(&self, external_id: &str) -> anyhow::Result<Option<BroadcastJob>> {
        (**self).find_job(external_id).await
    }

    async fn find_stuck_jobs(&self, cutoff: DateTime<Utc>) -> anyhow::Result<Vec<BroadcastJob>> {
        (**self).find_stuck_jobs(cutoff).await
    }

    async fn update_job(&self, id: i64, patch: JobPatch) -> anyhow::Result<bool> {
        (**self).update_job(id, patch).await
    }

    async fn claim_next_summary_job(
        &self,
        max_retries: i32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<ClaimOutcome> {
        (**self).claim_next_summary_job(max_retries, now).await
    }
}
