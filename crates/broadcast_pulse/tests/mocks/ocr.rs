use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use broadcast_pulse::ocr::IdentifierOcr;

#[derive(Clone, Default)]
pub struct MockOcr {
    /// Identifiers returned for specific images; other images yield the
    /// fallback list.
    pub by_path: Arc<Mutex<HashMap<PathBuf, Vec<String>>>>,
    pub fallback: Vec<String>,
    pub calls: Arc<Mutex<Vec<PathBuf>>>,
}

impl MockOcr {
    pub fn returning(identifiers: &[&str]) -> Self {
        Self {
            fallback: identifiers.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_image(self, path: &str, identifiers: &[&str]) -> Self {
        self.by_path.lock().unwrap().insert(
            PathBuf::from(path),
            identifiers.iter().map(|s| s.to_string()).collect(),
        );
        self
    }
}

impl IdentifierOcr for MockOcr {
    async fn extract_identifiers(&self, image: PathBuf) -> anyhow::Result<Vec<String>> {
        self.calls.lock().unwrap().push(image.clone());
        Ok(self
            .by_path
            .lock()
            .unwrap()
            .get(&image)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone()))
    }
}
