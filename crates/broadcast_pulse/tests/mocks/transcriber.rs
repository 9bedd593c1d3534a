use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use broadcast_pulse::{TranscribeResponse, TranscribeSegment, Transcriber};

#[derive(Clone)]
pub struct MockTranscriber {
    pub response_text: String,
    pub segments: Option<Vec<TranscribeSegment>>,
    pub delay: Option<Duration>,
    pub calls: Arc<Mutex<Vec<PathBuf>>>,
    pub fail_with: Option<String>,
}

impl MockTranscriber {
    pub fn new(response_text: &str) -> Self {
        Self {
            response_text: response_text.to_string(),
            segments: None,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn with_segments(mut self, segments: Vec<(f64, f64, &str)>) -> Self {
        self.segments = Some(
            segments
                .into_iter()
                .map(|(start, end, text)| TranscribeSegment {
                    start,
                    end,
                    text: text.to_string(),
                })
                .collect(),
        );
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new("")
        }
    }
}

impl Transcriber for MockTranscriber {
    const TRANSCRIBER_MODEL: &'static str = "mock-whisper";

    type Error = anyhow::Error;

    async fn transcribe(
        &self,
        audio_path: PathBuf,
        _language_hint: Option<String>,
    ) -> Result<TranscribeResponse, Self::Error> {
        self.calls.lock().unwrap().push(audio_path);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref msg) = self.fail_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(TranscribeResponse {
            duration: 120.0,
            text: self.response_text.clone(),
            segments: self.segments.clone(),
        })
    }
}
