use serde::{Deserialize, Serialize};

/// One recognized block of text with its confidence score (0.0–1.0).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecognizedRegion {
    pub text: String,
    /// Confidence in this region (0.0 = guessed, 1.0 = certain).
    pub confidence: f32,
}

impl RecognizedRegion {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self { text: text.into(), confidence: confidence.clamp(0.0, 1.0) }
    }
}

/// All text recognized on a single page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageText {
    /// Zero-based page index within the source document.
    pub page_index: usize,
    pub regions: Vec<RecognizedRegion>,
}

impl PageText {
    /// Regions joined with newlines, in recognition order.
    pub fn joined_text(&self) -> String {
        self.regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Mean region confidence; a page with no regions scores 0.0.
    pub fn mean_confidence(&self) -> f32 {
        if self.regions.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.regions.iter().map(|r| r.confidence).sum();
        sum / self.regions.len() as f32
    }

    pub fn is_empty(&self) -> bool {
        self.regions.iter().all(|r| r.text.trim().is_empty())
    }
}

/// The recognized text of a whole document, pages in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedText {
    pub pages: Vec<PageText>,
}

impl ExtractedText {
    /// Page texts joined with blank lines between pages.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(PageText::joined_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Mean confidence across all regions of all pages. Pages that produced
    /// nothing pull the mean down through their 0.0 score.
    pub fn mean_confidence(&self) -> f32 {
        if self.pages.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.pages.iter().map(PageText::mean_confidence).sum();
        sum / self.pages.len() as f32
    }

    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(PageText::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_clamps_confidence() {
        assert_eq!(RecognizedRegion::new("x", 1.5).confidence, 1.0);
        assert_eq!(RecognizedRegion::new("x", -0.1).confidence, 0.0);
    }

    #[test]
    fn page_with_no_regions_scores_zero() {
        let page = PageText { page_index: 0, regions: vec![] };
        assert_eq!(page.mean_confidence(), 0.0);
        assert!(page.is_empty());
    }

    #[test]
    fn full_text_separates_pages_with_blank_line() {
        let doc = ExtractedText {
            pages: vec![
                PageText {
                    page_index: 0,
                    regions: vec![
                        RecognizedRegion::new("EXTRATO DE CONTA", 0.9),
                        RecognizedRegion::new("05/03/2024 POSTO SHELL 40,00", 0.8),
                    ],
                },
                PageText {
                    page_index: 1,
                    regions: vec![RecognizedRegion::new("SALDO FINAL", 0.95)],
                },
            ],
        };
        assert_eq!(
            doc.full_text(),
            "EXTRATO DE CONTA\n05/03/2024 POSTO SHELL 40,00\n\nSALDO FINAL"
        );
    }

    #[test]
    fn mean_confidence_averages_over_pages() {
        let doc = ExtractedText {
            pages: vec![
                PageText {
                    page_index: 0,
                    regions: vec![RecognizedRegion::new("a", 0.8)],
                },
                PageText { page_index: 1, regions: vec![] },
            ],
        };
        assert!((doc.mean_confidence() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn whitespace_only_regions_count_as_empty() {
        let doc = ExtractedText {
            pages: vec![PageText {
                page_index: 0,
                regions: vec![RecognizedRegion::new("   \n", 0.9)],
            }],
        };
        assert!(doc.is_empty());
    }
}
