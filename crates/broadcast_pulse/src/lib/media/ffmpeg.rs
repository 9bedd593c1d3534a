use std::{path::PathBuf, process::Output, time::Duration};

use tokio::process::Command;

use crate::media::FrameCapture;

/// ffmpeg-backed frame and audio extraction.
#[derive(Debug, Clone)]
pub struct FfmpegCapture {
    ffmpeg_bin: String,
}

impl Default for FfmpegCapture {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegCapture {
    pub fn new(ffmpeg_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
        }
    }

    fn log_failure(context: &str, output: &Output) {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::warn!(
            status = ?output.status.code(),
            stderr = %stderr.trim(),
            "{context}"
        );
    }

    /// Runs ffmpeg with single-frame JPEG output on stdout. Empty stdout or
    /// a non-zero exit maps to `None`.
    async fn grab_frame(&self, input_args: &[&str]) -> anyhow::Result<Option<Vec<u8>>> {
        let output = Command::new(&self.ffmpeg_bin)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .args(input_args)
            .arg("-frames:v")
            .arg("1")
            .arg("-f")
            .arg("image2pipe")
            .arg("-vcodec")
            .arg("mjpeg")
            .arg("pipe:1")
            .output()
            .await?;

        if !output.status.success() || output.stdout.is_empty() {
            Self::log_failure("ffmpeg produced no frame", &output);
            return Ok(None);
        }
        Ok(Some(output.stdout))
    }
}

impl FrameCapture for FfmpegCapture {
    async fn capture_frame(&self, locator: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.grab_frame(&["-i", locator]).await
    }

    async fn capture_frame_at(
        &self,
        file: PathBuf,
        offset: Duration,
    ) -> anyhow::Result<Option<Vec<u8>>> {
        let offset = format!("{:.3}", offset.as_secs_f64());
        let file = file.to_string_lossy().into_owned();
        self.grab_frame(&["-ss", &offset, "-i", &file]).await
    }

    async fn extract_audio(
        &self,
        file: PathBuf,
        out_dir: PathBuf,
    ) -> anyhow::Result<Option<PathBuf>> {
        tokio::fs::create_dir_all(&out_dir).await?;

        let base_name = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());
        let audio_path = out_dir.join(format!("{base_name}.mp3"));

        if audio_path.exists() {
            tracing::debug!("Audio already exists at {}", audio_path.display());
            return Ok(Some(audio_path));
        }

        let output = Command::new(&self.ffmpeg_bin)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(&file)
            .arg("-vn")
            .arg("-acodec")
            .arg("libmp3lame")
            .arg(&audio_path)
            .output()
            .await?;

        if !output.status.success() || !audio_path.exists() {
            Self::log_failure("ffmpeg did not produce audio", &output);
            return Ok(None);
        }
        Ok(Some(audio_path))
    }
}
