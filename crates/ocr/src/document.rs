use image::DynamicImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("page {0} out of bounds")]
    PageOutOfBounds(usize),
    #[error("page render failed: {0}")]
    Render(String),
}

/// A page-oriented source document. Rendering is CPU-bound and synchronous;
/// callers offload it to blocking threads.
pub trait PaginatedDocument: Send + Sync {
    fn page_count(&self) -> usize;

    fn byte_len(&self) -> u64;

    /// Whether the document is password protected. Encrypted documents are
    /// rejected before any rendering work.
    fn is_encrypted(&self) -> bool {
        false
    }

    /// Render page `index` (zero-based) to an image suitable for recognition.
    fn render_page(&self, index: usize) -> Result<DynamicImage, DocumentError>;
}

/// Whether the bytes look like a PDF file.
pub fn is_pdf(data: &[u8]) -> bool {
    data.starts_with(b"%PDF-")
}

/// Crude but adequate encryption sniff: an `/Encrypt` entry in the trailer.
/// False positives are possible in pathological files; the cost is a clearer
/// error instead of garbage recognition output.
pub fn is_encrypted_pdf(data: &[u8]) -> bool {
    is_pdf(data) && data.windows(b"/Encrypt".len()).any(|w| w == b"/Encrypt")
}

// ── Mock document (used by extractor and pipeline tests) ──────────────────────

/// Scriptable document. Page `i` renders as a blank image of width `i + 1`,
/// which is how [`MockTextRecognizer`](crate::recognizer::MockTextRecognizer)
/// tells pages apart.
pub struct MockDocument {
    pages: usize,
    byte_len: u64,
    encrypted: bool,
    /// When set, rendering this page index fails.
    pub fail_page: Option<usize>,
}

impl MockDocument {
    pub fn new(pages: usize) -> Self {
        MockDocument { pages, byte_len: 1024, encrypted: false, fail_page: None }
    }

    pub fn with_byte_len(mut self, byte_len: u64) -> Self {
        self.byte_len = byte_len;
        self
    }

    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }
}

impl PaginatedDocument for MockDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn byte_len(&self) -> u64 {
        self.byte_len
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    fn render_page(&self, index: usize) -> Result<DynamicImage, DocumentError> {
        if index >= self.pages {
            return Err(DocumentError::PageOutOfBounds(index));
        }
        if self.fail_page == Some(index) {
            return Err(DocumentError::Render(format!("injected failure on page {index}")));
        }
        Ok(DynamicImage::new_luma8(index as u32 + 1, 4))
    }
}
