use std::collections::HashMap;

use image::DynamicImage;
use thiserror::Error;

use crate::types::RecognizedRegion;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("image decode error: {0}")]
    ImageDecode(String),
    #[error("recognition engine error: {0}")]
    Engine(String),
}

/// Faster recognition trades accuracy for latency; statement imports always
/// run `Accurate` since they are background work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccuracyLevel {
    Fast,
    Accurate,
}

#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// BCP-47 language tags, in preference order.
    pub languages: Vec<String>,
    pub accuracy: AccuracyLevel,
    /// Apply the engine's language model to fix up recognized words.
    pub language_correction: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        RecognitionConfig {
            languages: vec!["pt-BR".to_string(), "en-US".to_string()],
            accuracy: AccuracyLevel::Accurate,
            language_correction: true,
        }
    }
}

/// Abstraction over a page-level text recognition backend.
pub trait TextRecognizer: Send + Sync {
    fn recognize_page(
        &self,
        page: &DynamicImage,
        config: &RecognitionConfig,
    ) -> Result<Vec<RecognizedRegion>, RecognitionError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns pre-set regions keyed by page image width, so tests can script
/// different output per page without a real engine.
#[derive(Default)]
pub struct MockTextRecognizer {
    by_width: HashMap<u32, Vec<RecognizedRegion>>,
    /// When set, recognition fails for pages of this width.
    pub fail_width: Option<u32>,
}

impl MockTextRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, width: u32, regions: Vec<RecognizedRegion>) -> Self {
        self.by_width.insert(width, regions);
        self
    }
}

impl TextRecognizer for MockTextRecognizer {
    fn recognize_page(
        &self,
        page: &DynamicImage,
        _config: &RecognitionConfig,
    ) -> Result<Vec<RecognizedRegion>, RecognitionError> {
        let width = page.width();
        if self.fail_width == Some(width) {
            return Err(RecognitionError::Engine(format!(
                "injected failure for page width {width}"
            )));
        }
        Ok(self.by_width.get(&width).cloned().unwrap_or_default())
    }
}
