pub mod document;
pub mod extract;
pub mod recognizer;
pub mod types;

pub use document::{is_encrypted_pdf, is_pdf, DocumentError, MockDocument, PaginatedDocument};
pub use extract::{
    DocumentTextExtractor, ExtractError, DEFAULT_MAX_DOCUMENT_BYTES, DEFAULT_MIN_MEAN_CONFIDENCE,
};
pub use recognizer::{
    AccuracyLevel, MockTextRecognizer, RecognitionConfig, RecognitionError, TextRecognizer,
};
pub use types::{ExtractedText, PageText, RecognizedRegion};
