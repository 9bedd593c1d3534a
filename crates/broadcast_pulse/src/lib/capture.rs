use std::{sync::Arc, time::Duration};

use broadcast_datastore::{BroadcastJob, JobStore};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::{
    media::{FrameCapture, SnapshotStorage},
    supervisor::{lock_registry, WorkerRegistry},
};

pub(crate) struct CaptureContext<S, C, F> {
    pub store: Arc<S>,
    pub capture: Arc<C>,
    pub storage: Arc<F>,
    pub interval: Duration,
    pub registry: WorkerRegistry,
}

/// Terminal bookkeeping for a capture worker: cancels the token and
/// releases the registry entry when the worker future is dropped, whether
/// the loop returned or a collaborator panicked mid-poll.
struct WorkerGuard {
    external_id: String,
    token: CancellationToken,
    registry: WorkerRegistry,
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.token.cancel();
        lock_registry(&self.registry).remove(&self.external_id);
        tracing::info!(external_id = %self.external_id, "Capture worker stopped");
    }
}

/// Per-broadcast capture loop: one frame per interval until cancelled or
/// the broadcast stops being live. On any exit, panics included, the
/// worker cancels its own token and removes itself from the supervisor
/// registry so the broadcast's slot frees up.
pub(crate) async fn run_capture_loop<S, C, F>(
    ctx: CaptureContext<S, C, F>,
    job: BroadcastJob,
    token: CancellationToken,
) where
    S: JobStore + Send + Sync + 'static,
    C: FrameCapture + Send + Sync + 'static,
    F: SnapshotStorage + Send + Sync + 'static,
{
    let external_id = job.external_id.clone();
    let locator = job.stream_url.clone().unwrap_or_default();
    let _guard = WorkerGuard {
        external_id: external_id.clone(),
        token: token.clone(),
        registry: Arc::clone(&ctx.registry),
    };
    tracing::info!(%external_id, "Capture worker started");

    loop {
        if token.is_cancelled() {
            break;
        }

        // Liveness can flip between supervisor reconciliations, so every
        // pass re-reads it from the store.
        match ctx.store.find_job(&external_id).await {
            Ok(Some(current)) if current.is_live_now => {}
            Ok(_) => {
                tracing::info!(%external_id, "Broadcast no longer live; stopping capture");
                break;
            }
            Err(e) => {
                tracing::warn!(error = ?e, %external_id, "Liveness check failed; skipping capture attempt");
                if sleep_or_cancelled(&token, ctx.interval).await {
                    break;
                }
                continue;
            }
        }

        match ctx.capture.capture_frame(&locator).await {
            Ok(Some(bytes)) => {
                match ctx
                    .storage
                    .save_frame(bytes, &external_id, Utc::now(), "jpg")
                    .await
                {
                    Ok(Some(path)) => {
                        tracing::debug!(%external_id, path = %path.display(), "Snapshot persisted")
                    }
                    Ok(None) => tracing::warn!(%external_id, "Storage discarded snapshot"),
                    Err(e) => tracing::error!(error = ?e, %external_id, "Failed to persist snapshot"),
                }
            }
            Ok(None) => tracing::debug!(%external_id, "Capture attempt produced no frame"),
            Err(e) => tracing::error!(error = ?e, %external_id, "Capture attempt failed"),
        }

        if sleep_or_cancelled(&token, ctx.interval).await {
            break;
        }
    }
}

/// Returns true if cancellation fired before the interval elapsed.
async fn sleep_or_cancelled(token: &CancellationToken, interval: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = tokio::time::sleep(interval) => false,
    }
}
