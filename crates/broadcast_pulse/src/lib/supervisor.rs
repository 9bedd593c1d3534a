use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use broadcast_datastore::{BroadcastJob, JobStore};
use itertools::Itertools;
use tokio_util::sync::CancellationToken;

use crate::{
    capture::{self, CaptureContext},
    media::{FrameCapture, SnapshotStorage},
};

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// How often the live set is reconciled against running workers.
    pub reconcile_interval: Duration,
    /// Frame cadence handed to each capture worker.
    pub capture_interval: Duration,
    /// How long shutdown waits for workers to finish their current pass.
    pub shutdown_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(60),
            capture_interval: Duration::from_secs(10),
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

pub(crate) struct WorkerHandle {
    pub token: CancellationToken,
}

pub(crate) type WorkerRegistry = Arc<Mutex<HashMap<String, WorkerHandle>>>;

pub(crate) fn lock_registry(
    registry: &WorkerRegistry,
) -> MutexGuard<'_, HashMap<String, WorkerHandle>> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}

/// Keeps exactly one running capture worker per broadcast currently marked
/// live. Registry entries are removed only by the worker's own exit path,
/// never by the reconciler, so a cancelled worker's broadcast cannot get a
/// second worker before the first has released its resources.
pub struct SnapshotSupervisor<S, C, F> {
    store: Arc<S>,
    capture: Arc<C>,
    storage: Arc<F>,
    registry: WorkerRegistry,
    config: SupervisorConfig,
}

impl<S, C, F> SnapshotSupervisor<S, C, F>
where
    S: JobStore + Send + Sync + 'static,
    C: FrameCapture + Send + Sync + 'static,
    F: SnapshotStorage + Send + Sync + 'static,
{
    pub fn new(store: S, capture: C, storage: F, config: SupervisorConfig) -> Self {
        Self {
            store: Arc::new(store),
            capture: Arc::new(capture),
            storage: Arc::new(storage),
            registry: Arc::new(Mutex::new(HashMap::new())),
            config,
        }
    }

    /// Reconciles on a fixed interval until `shutdown` fires, then drains
    /// the remaining workers.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.reconcile_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            if let Err(e) = self.reconcile().await {
                // keep the current worker set; the next tick retries
                tracing::error!(error = ?e, "Reconcile query failed");
            }
        }
        self.drain().await;
    }

    /// One reconciliation pass: cancel workers whose broadcast left the
    /// live set, start workers for newly live broadcasts.
    #[tracing::instrument(skip(self))]
    pub async fn reconcile(&self) -> anyhow::Result<()> {
        let live: HashMap<String, BroadcastJob> = self
            .store
            .find_live_jobs()
            .await?
            .into_iter()
            .filter(|job| {
                !job.external_id.is_empty()
                    && job.stream_url.as_deref().is_some_and(|url| !url.is_empty())
            })
            .map(|job| (job.external_id.clone(), job))
            .collect();

        let to_start: Vec<BroadcastJob> = {
            let registry = lock_registry(&self.registry);
            for (external_id, handle) in registry.iter() {
                if !live.contains_key(external_id) {
                    tracing::info!(%external_id, "Broadcast left live set; cancelling capture worker");
                    handle.token.cancel();
                }
            }
            live.into_values()
                .filter(|job| !registry.contains_key(&job.external_id))
                .collect()
        };

        for job in to_start {
            self.spawn_worker(job);
        }
        Ok(())
    }

    fn spawn_worker(&self, job: BroadcastJob) {
        let token = CancellationToken::new();
        {
            let mut registry = lock_registry(&self.registry);
            // a cancelled worker that has not yet unregistered still owns
            // this broadcast's resources
            if registry.contains_key(&job.external_id) {
                return;
            }
            registry.insert(
                job.external_id.clone(),
                WorkerHandle {
                    token: token.clone(),
                },
            );
        }
        tracing::info!(external_id = %job.external_id, "Starting capture worker");

        let ctx = CaptureContext {
            store: Arc::clone(&self.store),
            capture: Arc::clone(&self.capture),
            storage: Arc::clone(&self.storage),
            interval: self.config.capture_interval,
            registry: Arc::clone(&self.registry),
        };
        tokio::spawn(capture::run_capture_loop(ctx, job, token));
    }

    /// External ids with a registered capture worker, sorted.
    pub fn active_workers(&self) -> Vec<String> {
        lock_registry(&self.registry).keys().cloned().sorted().collect()
    }

    pub fn cancel_all_workers(&self) {
        for handle in lock_registry(&self.registry).values() {
            handle.token.cancel();
        }
    }

    /// Cancels every worker and waits up to the configured grace period for
    /// them to unregister.
    pub async fn drain(&self) {
        self.cancel_all_workers();

        let deadline = tokio::time::Instant::now() + self.config.shutdown_grace;
        while !lock_registry(&self.registry).is_empty() {
            if tokio::time::Instant::now() >= deadline {
                let remaining = self.active_workers();
                tracing::warn!(?remaining, "Capture workers still running after grace period");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
