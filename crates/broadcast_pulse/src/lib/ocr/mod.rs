//! OCR collaborator contract plus identifier validation. The engine
//! returns raw text; only strings matching the process-number format
//! survive, normalized to canonical `NNNNNNN-DD.YYYY.D.DD.DDDD` form.

pub mod tesseract;

use std::{future::Future, path::PathBuf, sync::LazyLock};

use regex::Regex;

static PROCESS_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{7})-?(\d{2})\.?(\d{4})\.?(\d)\.?(\d{2})\.?(\d{4})\b").unwrap()
});

pub trait IdentifierOcr {
    /// Validated, normalized process identifiers found in one image.
    /// An empty list is a normal outcome for frames with no overlay text.
    fn extract_identifiers(
        &self,
        image: PathBuf,
    ) -> impl Future<Output = anyhow::Result<Vec<String>>> + Send;
}

/// Pulls every well-formed process identifier out of raw OCR text,
/// deduplicated in first-seen order.
pub fn extract_valid_identifiers(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for caps in PROCESS_ID_RE.captures_iter(text) {
        let normalized = format!(
            "{}-{}.{}.{}.{}.{}",
            &caps[1], &caps[2], &caps[3], &caps[4], &caps[5], &caps[6]
        );
        if !seen.contains(&normalized) {
            seen.push(normalized);
        }
    }
    seen
}
