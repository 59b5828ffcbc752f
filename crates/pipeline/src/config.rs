use serde::Deserialize;
use thiserror::Error;

use extrato_ocr::{DEFAULT_MAX_DOCUMENT_BYTES, DEFAULT_MIN_MEAN_CONFIDENCE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid import config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunables for an import run. Every field has a default, so an empty config
/// file is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Documents above this size are rejected up front.
    pub max_document_bytes: u64,
    /// How far back to look in the ledger when matching duplicates.
    pub dedup_window_days: i64,
    /// Mean recognition confidence below which a document import fails.
    pub min_mean_confidence: f32,
    /// Recognition languages, BCP-47, in preference order.
    pub languages: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            dedup_window_days: 90,
            min_mean_confidence: DEFAULT_MIN_MEAN_CONFIDENCE,
            languages: vec!["pt-BR".to_string(), "en-US".to_string()],
        }
    }
}

impl ImportConfig {
    pub fn from_toml(text: &str) -> Result<ImportConfig, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = ImportConfig::from_toml("").unwrap();
        assert_eq!(config.dedup_window_days, 90);
        assert_eq!(config.max_document_bytes, DEFAULT_MAX_DOCUMENT_BYTES);
        assert_eq!(config.languages, vec!["pt-BR", "en-US"]);
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let config = ImportConfig::from_toml(
            "dedup_window_days = 30\nlanguages = [\"pt-BR\"]\n",
        )
        .unwrap();
        assert_eq!(config.dedup_window_days, 30);
        assert_eq!(config.languages, vec!["pt-BR"]);
        assert_eq!(config.max_document_bytes, DEFAULT_MAX_DOCUMENT_BYTES);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ImportConfig::from_toml("dedup_widnow_days = 30\n").is_err());
    }
}
