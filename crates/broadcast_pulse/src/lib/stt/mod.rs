pub mod whisper;

use std::{fmt::Debug, future::Future, path::PathBuf};

use serde::Deserialize;

pub trait Transcriber {
    const TRANSCRIBER_MODEL: &'static str;

    type Error: Debug;

    /// Transcribes one whole audio file. Long sessions can take minutes;
    /// implementations must stay cancellation-safe at await points.
    fn transcribe(
        &self,
        audio_path: PathBuf,
        language_hint: Option<String>,
    ) -> impl Future<Output = Result<TranscribeResponse, Self::Error>> + Send;
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscribeResponse {
    pub duration: f64,
    pub text: String,
    pub segments: Option<Vec<TranscribeSegment>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscribeSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}
