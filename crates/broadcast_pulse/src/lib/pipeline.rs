use std::time::Duration;

use broadcast_datastore::JobStore;
use tokio_util::sync::CancellationToken;

use crate::{
    dispatcher::{CycleOutcome, DispatcherConfig, SummaryDispatcher},
    media::{FrameCapture, SnapshotStorage},
    ocr::IdentifierOcr,
    stt::Transcriber,
    supervisor::{SnapshotSupervisor, SupervisorConfig},
};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub reconcile_interval: Duration,
    pub capture_interval: Duration,
    pub check_interval: Duration,
    pub max_retries: i32,
    pub processing_timeout: chrono::Duration,
    pub language_hint: Option<String>,
    pub shutdown_grace: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(60),
            capture_interval: Duration::from_secs(10),
            check_interval: Duration::from_secs(30),
            max_retries: 3,
            processing_timeout: chrono::Duration::minutes(15),
            language_hint: None,
            shutdown_grace: Duration::from_secs(10),
        }
    }
}

pub struct PipelineBuilder<S = (), C = (), F = (), O = (), T = ()> {
    config: PipelineConfig,
    store: S,
    capture: C,
    storage: F,
    ocr: O,
    transcriber: T,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            store: (),
            capture: (),
            storage: (),
            ocr: (),
            transcriber: (),
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, C, F, O, T> PipelineBuilder<S, C, F, O, T> {
    pub fn store<S2: JobStore + Clone + Send + Sync + 'static>(
        self,
        store: S2,
    ) -> PipelineBuilder<S2, C, F, O, T> {
        PipelineBuilder {
            config: self.config,
            store,
            capture: self.capture,
            storage: self.storage,
            ocr: self.ocr,
            transcriber: self.transcriber,
        }
    }

    pub fn capture<C2: FrameCapture + Send + Sync + 'static>(
        self,
        capture: C2,
    ) -> PipelineBuilder<S, C2, F, O, T> {
        PipelineBuilder {
            config: self.config,
            store: self.store,
            capture,
            storage: self.storage,
            ocr: self.ocr,
            transcriber: self.transcriber,
        }
    }

    pub fn storage<F2: SnapshotStorage + Clone + Send + Sync + 'static>(
        self,
        storage: F2,
    ) -> PipelineBuilder<S, C, F2, O, T> {
        PipelineBuilder {
            config: self.config,
            store: self.store,
            capture: self.capture,
            storage,
            ocr: self.ocr,
            transcriber: self.transcriber,
        }
    }

    pub fn ocr<O2: IdentifierOcr + Send + Sync + 'static>(
        self,
        ocr: O2,
    ) -> PipelineBuilder<S, C, F, O2, T> {
        PipelineBuilder {
            config: self.config,
            store: self.store,
            capture: self.capture,
            storage: self.storage,
            ocr,
            transcriber: self.transcriber,
        }
    }

    pub fn transcriber<T2: Transcriber + Send + Sync + 'static>(
        self,
        transcriber: T2,
    ) -> PipelineBuilder<S, C, F, O, T2> {
        PipelineBuilder {
            config: self.config,
            store: self.store,
            capture: self.capture,
            storage: self.storage,
            ocr: self.ocr,
            transcriber,
        }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_retries(mut self, max_retries: i32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    pub fn language_hint(mut self, hint: impl Into<String>) -> Self {
        self.config.language_hint = Some(hint.into());
        self
    }
}

impl<S, C, F, O, T> PipelineBuilder<S, C, F, O, T>
where
    S: JobStore + Clone + Send + Sync + 'static,
    C: FrameCapture + Send + Sync + 'static,
    F: SnapshotStorage + Clone + Send + Sync + 'static,
    O: IdentifierOcr + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
{
    pub fn build(self) -> Pipeline<S, C, F, O, T> {
        let supervisor = SnapshotSupervisor::new(
            self.store.clone(),
            self.capture,
            self.storage.clone(),
            SupervisorConfig {
                reconcile_interval: self.config.reconcile_interval,
                capture_interval: self.config.capture_interval,
                shutdown_grace: self.config.shutdown_grace,
            },
        );
        let dispatcher = SummaryDispatcher::new(
            self.store,
            self.ocr,
            self.transcriber,
            self.storage,
            DispatcherConfig {
                check_interval: self.config.check_interval,
                max_retries: self.config.max_retries,
                processing_timeout: self.config.processing_timeout,
                language_hint: self.config.language_hint,
            },
        );
        Pipeline {
            supervisor,
            dispatcher,
        }
    }
}

/// The assembled system: snapshot supervision plus summary dispatch, run
/// as two cooperative loops off one shutdown token.
pub struct Pipeline<S, C, F, O, T> {
    supervisor: SnapshotSupervisor<S, C, F>,
    dispatcher: SummaryDispatcher<S, O, T, F>,
}

impl<S, C, F, O, T> Pipeline<S, C, F, O, T>
where
    S: JobStore + Clone + Send + Sync + 'static,
    C: FrameCapture + Send + Sync + 'static,
    F: SnapshotStorage + Clone + Send + Sync + 'static,
    O: IdentifierOcr + Send + Sync + 'static,
    T: Transcriber + Send + Sync + 'static,
{
    pub async fn run(&self, shutdown: CancellationToken) {
        futures::join!(
            self.supervisor.run(shutdown.child_token()),
            self.dispatcher.run(shutdown.child_token()),
        );
    }

    /// One dispatcher cycle plus a reclaim pass, for cron-style invocation.
    pub async fn run_dispatcher_cycle(&self) -> anyhow::Result<CycleOutcome> {
        let outcome = self.dispatcher.run_cycle(&CancellationToken::new()).await?;
        self.dispatcher.reclaim_stuck_jobs().await?;
        Ok(outcome)
    }
}
