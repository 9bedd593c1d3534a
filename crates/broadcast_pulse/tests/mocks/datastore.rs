use std::sync::{Arc, Mutex};

use broadcast_datastore::{
    BroadcastJob, ClaimOutcome, JobPatch, JobStore, SummaryStatus,
};
use chrono::{DateTime, Utc};

/// In-memory job store. Every operation runs under one mutex, so the claim
/// is atomic the way the real store's find-and-modify is.
#[derive(Clone, Default)]
pub struct MockJobStore {
    pub jobs: Arc<Mutex<Vec<BroadcastJob>>>,
    pub updates: Arc<Mutex<Vec<(i64, JobPatch)>>>,
    pub fail_with: Arc<Mutex<Option<String>>>,
}

impl MockJobStore {
    pub fn with_jobs(jobs: Vec<BroadcastJob>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(jobs)),
            ..Default::default()
        }
    }

    pub fn set_failing(&self, msg: Option<&str>) {
        *self.fail_with.lock().unwrap() = msg.map(str::to_string);
    }

    pub fn job(&self, id: i64) -> Option<BroadcastJob> {
        self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned()
    }

    pub fn set_live(&self, external_id: &str, live: bool) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.iter_mut().find(|j| j.external_id == external_id) {
            job.is_live_now = live;
        }
    }

    fn failure(&self) -> Option<anyhow::Error> {
        self.fail_with
            .lock()
            .unwrap()
            .as_ref()
            .map(|msg| anyhow::anyhow!("{msg}"))
    }
}

impl JobStore for MockJobStore {
    async fn find_live_jobs(&self) -> anyhow::Result<Vec<BroadcastJob>> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| {
                j.is_live_now
                    && !j.external_id.is_empty()
                    && j.stream_url.as_deref().is_some_and(|u| !u.is_empty())
            })
            .cloned()
            .collect())
    }

    async fn find_job(&self, external_id: &str) -> anyhow::Result<Option<BroadcastJob>> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .find(|j| j.external_id == external_id)
            .cloned())
    }

    async fn find_stuck_jobs(&self, cutoff: DateTime<Utc>) -> anyhow::Result<Vec<BroadcastJob>> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .iter()
            .filter(|j| {
                j.summary_status == Some(SummaryStatus::Processing)
                    && j.summary_started_at.is_some_and(|t| t < cutoff)
            })
            .cloned()
            .collect())
    }

    async fn update_job(&self, id: i64, patch: JobPatch) -> anyhow::Result<bool> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        self.updates.lock().unwrap().push((id, patch.clone()));
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.iter_mut().find(|j| j.id == id) {
            Some(job) => {
                job.apply(&patch);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn claim_next_summary_job(
        &self,
        max_retries: i32,
        now: DateTime<Utc>,
    ) -> anyhow::Result<ClaimOutcome> {
        if let Some(err) = self.failure() {
            return Err(err);
        }
        let mut jobs = self.jobs.lock().unwrap();
        let mut eligible: Vec<&mut BroadcastJob> = jobs
            .iter_mut()
            .filter(|j| j.is_summary_eligible(max_retries))
            .collect();
        eligible.sort_by_key(|j| j.started_at);

        match eligible.into_iter().next() {
            Some(job) => {
                job.summary_status = Some(SummaryStatus::Processing);
                job.summary_started_at = Some(now);
                job.summary_retry_count += 1;
                Ok(ClaimOutcome::Claimed(Box::new(job.clone())))
            }
            None => Ok(ClaimOutcome::NoneAvailable),
        }
    }
}
