use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use broadcast_pulse::media::FrameCapture;

#[derive(Clone)]
pub struct MockFrameCapture {
    pub frame: Option<Vec<u8>>,
    pub panic_on_capture: bool,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl Default for MockFrameCapture {
    fn default() -> Self {
        Self {
            frame: Some(vec![0xFF, 0xD8, 0xFF]),
            panic_on_capture: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl MockFrameCapture {
    pub fn empty() -> Self {
        Self {
            frame: None,
            ..Default::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic_on_capture: true,
            ..Default::default()
        }
    }
}

impl FrameCapture for MockFrameCapture {
    async fn capture_frame(&self, locator: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.calls.lock().unwrap().push(locator.to_string());
        if self.panic_on_capture {
            panic!("frame grab blew up");
        }
        Ok(self.frame.clone())
    }

    async fn capture_frame_at(
        &self,
        file: PathBuf,
        _offset: Duration,
    ) -> anyhow::Result<Option<Vec<u8>>> {
        self.calls
            .lock()
            .unwrap()
            .push(file.to_string_lossy().into_owned());
        Ok(self.frame.clone())
    }

    async fn extract_audio(
        &self,
        _file: PathBuf,
        _out_dir: PathBuf,
    ) -> anyhow::Result<Option<PathBuf>> {
        Ok(None)
    }
}
