use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;

const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Whole-request ceiling; weights run to a few GB on slow links.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("recognition model is not downloaded")]
    Unavailable,
    #[error("model download failed: {0}")]
    DownloadFailed(String),
    #[error("model load failed: {0}")]
    LoadFailed(String),
    #[error("model inference failed: {0}")]
    InferenceFailed(String),
    #[error("model produced unparseable output: {0}")]
    InvalidOutput(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Abstraction over the local language model runtime. Implementations take a
/// prompt and return the raw completion text.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Manages the model weights on disk: presence check, resumable-ish download
/// (temp file plus rename, so a crashed download never leaves a half model
/// behind), and eviction to reclaim space.
pub struct ModelManager {
    model_path: PathBuf,
    source_url: String,
}

impl ModelManager {
    pub fn new(model_path: impl Into<PathBuf>, source_url: impl Into<String>) -> Self {
        ModelManager { model_path: model_path.into(), source_url: source_url.into() }
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Whether the weights are present. Callers must check this before
    /// running inference; recognition fails fast with `Unavailable` otherwise.
    pub fn is_available(&self) -> bool {
        self.model_path.exists()
    }

    /// Download the weights, reporting progress as a 0.0–1.0 fraction on
    /// `progress`. A no-op when the model is already present.
    pub async fn download(&self, progress: &watch::Sender<f32>) -> Result<(), ModelError> {
        if self.is_available() {
            let _ = progress.send(1.0);
            return Ok(());
        }

        let client = reqwest::Client::builder()
            .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .map_err(|e| ModelError::DownloadFailed(e.to_string()))?;
        let response = client
            .get(&self.source_url)
            .send()
            .await
            .map_err(|e| ModelError::DownloadFailed(e.to_string()))?
            .error_for_status()
            .map_err(|e| ModelError::DownloadFailed(e.to_string()))?;
        let total = response.content_length();

        if let Some(parent) = self.model_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let partial_path = self.model_path.with_extension("part");
        let mut file = tokio::fs::File::create(&partial_path).await?;

        let mut downloaded: u64 = 0;
        let mut response = response;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ModelError::DownloadFailed(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            if let Some(total) = total {
                let fraction = (downloaded as f32 / total as f32).clamp(0.0, 1.0);
                let _ = progress.send(fraction);
            }
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&partial_path, &self.model_path).await?;
        let _ = progress.send(1.0);
        tracing::info!(path = %self.model_path.display(), bytes = downloaded, "model downloaded");
        Ok(())
    }

    /// Read the weights for backend construction. Missing weights fail with
    /// `Unavailable`; an unreadable or empty weights file fails with
    /// `LoadFailed` so callers can tell a broken install from an absent one.
    pub async fn load(&self) -> Result<Vec<u8>, ModelError> {
        if !self.is_available() {
            return Err(ModelError::Unavailable);
        }
        let weights = tokio::fs::read(&self.model_path)
            .await
            .map_err(|e| ModelError::LoadFailed(e.to_string()))?;
        if weights.is_empty() {
            return Err(ModelError::LoadFailed(format!(
                "weights file {} is empty",
                self.model_path.display()
            )));
        }
        Ok(weights)
    }

    /// Remove the weights from disk. Succeeds when nothing is there.
    pub async fn evict(&self) -> Result<(), ModelError> {
        match tokio::fs::remove_file(&self.model_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ModelError::Io(e)),
        }
    }
}

// ── Mock backend (used by recognizer and pipeline tests) ──────────────────────

/// Returns a pre-set completion, or fails when scripted to.
#[derive(Default)]
pub struct MockInference {
    pub response: String,
    pub fail: bool,
}

impl MockInference {
    pub fn new(response: impl Into<String>) -> Self {
        MockInference { response: response.into(), fail: false }
    }

    pub fn failing() -> Self {
        MockInference { response: String::new(), fail: true }
    }
}

#[async_trait]
impl InferenceBackend for MockInference {
    async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
        if self.fail {
            return Err(ModelError::InferenceFailed("injected failure".to_string()));
        }
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manager_reports_missing_weights() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path().join("weights.bin"), "http://127.0.0.1:1/");
        assert!(!manager.is_available());
    }

    #[tokio::test]
    async fn evict_of_missing_weights_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path().join("weights.bin"), "http://127.0.0.1:1/");
        manager.evict().await.unwrap();
    }

    #[tokio::test]
    async fn evict_removes_present_weights() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.bin");
        tokio::fs::write(&path, b"fake weights").await.unwrap();

        let manager = ModelManager::new(&path, "http://127.0.0.1:1/");
        assert!(manager.is_available());
        manager.evict().await.unwrap();
        assert!(!manager.is_available());
    }

    #[tokio::test]
    async fn load_of_missing_weights_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(dir.path().join("weights.bin"), "http://127.0.0.1:1/");
        assert!(matches!(manager.load().await, Err(ModelError::Unavailable)));
    }

    #[tokio::test]
    async fn load_of_empty_weights_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.bin");
        tokio::fs::write(&path, b"").await.unwrap();

        let manager = ModelManager::new(&path, "http://127.0.0.1:1/");
        assert!(matches!(manager.load().await, Err(ModelError::LoadFailed(_))));
    }

    #[tokio::test]
    async fn load_returns_weight_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.bin");
        tokio::fs::write(&path, b"fake weights").await.unwrap();

        let manager = ModelManager::new(&path, "http://127.0.0.1:1/");
        assert_eq!(manager.load().await.unwrap(), b"fake weights");
    }

    #[tokio::test]
    async fn failed_download_leaves_no_model_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.bin");
        // Port 1 refuses connections immediately.
        let manager = ModelManager::new(&path, "http://127.0.0.1:1/weights.bin");

        let (tx, rx) = watch::channel(0.0f32);
        let err = manager.download(&tx).await.unwrap_err();
        assert!(matches!(err, ModelError::DownloadFailed(_)));
        assert!(!manager.is_available());
        assert_eq!(*rx.borrow(), 0.0);
    }

    #[tokio::test]
    async fn download_is_a_noop_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.bin");
        tokio::fs::write(&path, b"fake weights").await.unwrap();

        let manager = ModelManager::new(&path, "http://127.0.0.1:1/");
        let (tx, rx) = watch::channel(0.0f32);
        manager.download(&tx).await.unwrap();
        assert_eq!(*rx.borrow(), 1.0);
    }

    #[tokio::test]
    async fn mock_inference_returns_preset_completion() {
        let backend = MockInference::new("[]");
        assert_eq!(backend.complete("anything").await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn mock_inference_injected_failure() {
        let backend = MockInference::failing();
        assert!(matches!(
            backend.complete("anything").await,
            Err(ModelError::InferenceFailed(_))
        ));
    }
}
