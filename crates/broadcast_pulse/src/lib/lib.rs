mod capture;
pub mod correlate;
mod dispatcher;
pub mod media;
pub mod ocr;
mod pipeline;
mod supervisor;
pub mod stt;
pub mod tracing;

pub use dispatcher::{CycleOutcome, DispatcherConfig, SummaryDispatcher};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineConfig};
pub use stt::{
    whisper::WhisperClient, TranscribeResponse, TranscribeSegment, Transcriber,
};
pub use supervisor::{SnapshotSupervisor, SupervisorConfig};
