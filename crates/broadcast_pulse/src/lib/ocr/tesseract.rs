use std::path::PathBuf;

use tokio::process::Command;

use crate::ocr::{extract_valid_identifiers, IdentifierOcr};

/// Shells out to the tesseract CLI and filters its output through the
/// identifier validator.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    tesseract_bin: String,
    language: Option<String>,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract", None)
    }
}

impl TesseractOcr {
    pub fn new(tesseract_bin: impl Into<String>, language: Option<String>) -> Self {
        Self {
            tesseract_bin: tesseract_bin.into(),
            language,
        }
    }
}

impl IdentifierOcr for TesseractOcr {
    async fn extract_identifiers(&self, image: PathBuf) -> anyhow::Result<Vec<String>> {
        let mut command = Command::new(&self.tesseract_bin);
        command.arg(&image).arg("stdout");
        if let Some(ref language) = self.language {
            command.arg("-l").arg(language);
        }

        let output = command.output().await?;
        if !output.status.success() {
            // A frame tesseract cannot read is a skipped attempt, not a failure
            // of the whole job.
            tracing::warn!(
                image = %image.display(),
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "tesseract failed on snapshot"
            );
            return Ok(Vec::new());
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(extract_valid_identifiers(&text))
    }
}
