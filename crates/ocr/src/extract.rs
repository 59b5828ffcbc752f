use std::sync::Arc;

use thiserror::Error;

use crate::document::{is_encrypted_pdf, DocumentError, PaginatedDocument};
use crate::recognizer::{RecognitionConfig, RecognitionError, TextRecognizer};
use crate::types::{ExtractedText, PageText};

/// Documents above this size are rejected before any rendering work.
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 50 * 1024 * 1024;

/// Below this mean confidence the recognition output is considered garbage
/// and the whole extraction fails rather than producing bad transactions.
pub const DEFAULT_MIN_MEAN_CONFIDENCE: f32 = 0.2;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document is {actual} bytes, limit is {max}")]
    FileTooLarge { actual: u64, max: u64 },
    #[error("document is encrypted")]
    Encrypted,
    #[error("no text recognized on any page")]
    NoText,
    #[error("mean recognition confidence {score:.2} too low to trust")]
    LowConfidence { score: f32 },
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
    #[error("recognition worker failed: {0}")]
    Worker(String),
}

/// Runs a [`TextRecognizer`] over every page of a document. Rendering and
/// recognition are CPU-bound, so each page runs on the blocking pool; pages
/// run concurrently but results are reassembled in page order.
pub struct DocumentTextExtractor<R> {
    recognizer: Arc<R>,
    config: RecognitionConfig,
    max_document_bytes: u64,
    min_mean_confidence: f32,
}

impl<R: TextRecognizer + 'static> DocumentTextExtractor<R> {
    pub fn new(recognizer: R) -> Self {
        DocumentTextExtractor {
            recognizer: Arc::new(recognizer),
            config: RecognitionConfig::default(),
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            min_mean_confidence: DEFAULT_MIN_MEAN_CONFIDENCE,
        }
    }

    pub fn with_config(mut self, config: RecognitionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_limits(mut self, max_document_bytes: u64, min_mean_confidence: f32) -> Self {
        self.max_document_bytes = max_document_bytes;
        self.min_mean_confidence = min_mean_confidence;
        self
    }

    /// Checks raw file bytes before any document is built: size cap and
    /// encryption sniff.
    pub fn ensure_importable(&self, data: &[u8]) -> Result<(), ExtractError> {
        let actual = data.len() as u64;
        if actual > self.max_document_bytes {
            return Err(ExtractError::FileTooLarge { actual, max: self.max_document_bytes });
        }
        if is_encrypted_pdf(data) {
            return Err(ExtractError::Encrypted);
        }
        Ok(())
    }

    pub async fn extract(
        &self,
        document: Arc<dyn PaginatedDocument>,
    ) -> Result<ExtractedText, ExtractError> {
        let actual = document.byte_len();
        if actual > self.max_document_bytes {
            return Err(ExtractError::FileTooLarge { actual, max: self.max_document_bytes });
        }
        if document.is_encrypted() {
            return Err(ExtractError::Encrypted);
        }

        let page_count = document.page_count();
        if page_count == 0 {
            return Err(ExtractError::NoText);
        }

        let mut handles = Vec::with_capacity(page_count);
        for page_index in 0..page_count {
            let document = Arc::clone(&document);
            let recognizer = Arc::clone(&self.recognizer);
            let config = self.config.clone();
            handles.push(tokio::task::spawn_blocking(
                move || -> Result<PageText, ExtractError> {
                    let image = document.render_page(page_index)?;
                    let regions = recognizer.recognize_page(&image, &config)?;
                    Ok(PageText { page_index, regions })
                },
            ));
        }

        let mut pages = Vec::with_capacity(page_count);
        for handle in handles {
            let page = handle
                .await
                .map_err(|e| ExtractError::Worker(e.to_string()))??;
            pages.push(page);
        }

        let extracted = ExtractedText { pages };
        let score = extracted.mean_confidence();
        tracing::debug!(pages = page_count, score, "document recognition finished");

        if extracted.is_empty() {
            return Err(ExtractError::NoText);
        }
        if score < self.min_mean_confidence {
            return Err(ExtractError::LowConfidence { score });
        }
        Ok(extracted)
    }
}
