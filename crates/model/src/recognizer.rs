use chrono::NaiveDate;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use extrato_core::{CandidateTransaction, Category, TransactionKind};

use crate::engine::{InferenceBackend, ModelError};
use crate::prompt::build_prompt;

/// One element of the model's JSON array output. Everything beyond the first
/// three fields is optional so a slightly sloppy completion still parses.
#[derive(Debug, Deserialize)]
struct ModelRecord {
    date: String,
    description: String,
    amount: f64,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

#[derive(Debug)]
pub struct Recognition {
    pub candidates: Vec<CandidateTransaction>,
    /// Records the model emitted that had to be discarded (bad date, bad
    /// amount). High counts indicate garbage recognition input.
    pub dropped_records: usize,
}

/// Turns recognized statement text into candidate transactions via the local
/// model. Top-level output that fails to parse as a JSON array is a hard
/// error; individually bad records are dropped and counted.
pub struct StatementTextRecognizer<B> {
    backend: B,
    available: bool,
}

impl<B: InferenceBackend> StatementTextRecognizer<B> {
    pub fn new(backend: B) -> Self {
        StatementTextRecognizer { backend, available: true }
    }

    /// Gate recognition on model presence, typically fed from
    /// [`ModelManager::is_available`](crate::engine::ModelManager::is_available).
    pub fn with_availability(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub async fn recognize(&self, statement_text: &str) -> Result<Recognition, ModelError> {
        if !self.available {
            return Err(ModelError::Unavailable);
        }

        let prompt = build_prompt(statement_text);
        let raw = self.backend.complete(&prompt).await?;
        let records = parse_model_output(&raw)?;

        let mut candidates = Vec::with_capacity(records.len());
        let mut dropped_records = 0;
        for (ordinal, record) in records.iter().enumerate() {
            match candidate_from_record(record, ordinal) {
                Some(candidate) => candidates.push(candidate),
                None => {
                    dropped_records += 1;
                    tracing::debug!(
                        date = %record.date,
                        description = %record.description,
                        "dropping unusable model record"
                    );
                }
            }
        }

        Ok(Recognition { candidates, dropped_records })
    }
}

/// Models wrap JSON in markdown fences often enough that stripping them is
/// table stakes.
fn parse_model_output(raw: &str) -> Result<Vec<ModelRecord>, ModelError> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(cleaned).map_err(|e| {
        ModelError::InvalidOutput(format!(
            "{e}. Raw: {}",
            &raw[..raw.len().min(200)]
        ))
    })
}

fn candidate_from_record(record: &ModelRecord, ordinal: usize) -> Option<CandidateTransaction> {
    let date = NaiveDate::parse_from_str(record.date.trim(), "%Y-%m-%d").ok()?;
    let amount_cents = (Decimal::from_f64(record.amount)?.abs() * Decimal::from(100))
        .round()
        .to_i64()?;
    let description = record.description.trim().to_string();
    if description.is_empty() {
        return None;
    }

    let kind = TransactionKind::parse_lenient(&record.kind);
    let category = record.category.as_deref().map(Category::from_keyword);

    Some(
        CandidateTransaction {
            id: synthesize_id(date, &description, amount_cents, ordinal),
            date,
            description,
            amount_cents,
            kind,
            category,
            confidence: record.confidence.unwrap_or(0.5),
        }
        .clamped_confidence(),
    )
}

/// Document imports have no FITID, so the id is content-derived: the same
/// statement recognized twice yields the same ids. The ordinal keeps two
/// identical purchases on the same day distinct.
fn synthesize_id(date: NaiveDate, description: &str, amount_cents: i64, ordinal: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(description.as_bytes());
    hasher.update(b"|");
    hasher.update(amount_cents.to_le_bytes());
    hasher.update(b"|");
    hasher.update(ordinal.to_le_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("pdf-{hex}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockInference;

    const GOOD_OUTPUT: &str = r#"[
        {"date": "2024-03-05", "description": "Posto Shell", "amount": 40.0,
         "type": "expense", "category": "transport", "confidence": 0.9},
        {"date": "2024-03-10", "description": "Salário ACME", "amount": 5000.0,
         "type": "income", "category": "income", "confidence": 0.95}
    ]"#;

    #[tokio::test]
    async fn recognizes_well_formed_output() {
        let recognizer = StatementTextRecognizer::new(MockInference::new(GOOD_OUTPUT));
        let result = recognizer.recognize("statement text").await.unwrap();

        assert_eq!(result.candidates.len(), 2);
        assert_eq!(result.dropped_records, 0);

        let shell = &result.candidates[0];
        assert_eq!(shell.amount_cents, 4000);
        assert_eq!(shell.kind, TransactionKind::Expense);
        assert_eq!(shell.category, Some(Category::Transport));
        assert!(shell.id.starts_with("pdf-"));

        let salary = &result.candidates[1];
        assert_eq!(salary.kind, TransactionKind::Income);
        assert_eq!(salary.amount_cents, 500_000);
    }

    #[tokio::test]
    async fn strips_markdown_fences() {
        let fenced = format!("```json\n{GOOD_OUTPUT}\n```");
        let recognizer = StatementTextRecognizer::new(MockInference::new(fenced));
        let result = recognizer.recognize("text").await.unwrap();
        assert_eq!(result.candidates.len(), 2);
    }

    #[tokio::test]
    async fn unparseable_output_is_a_hard_error() {
        let recognizer =
            StatementTextRecognizer::new(MockInference::new("the statement shows 3 purchases"));
        let err = recognizer.recognize("text").await.unwrap_err();
        assert!(matches!(err, ModelError::InvalidOutput(_)));
    }

    #[tokio::test]
    async fn bad_records_are_dropped_and_counted() {
        let mixed = r#"[
            {"date": "2024-03-05", "description": "Posto Shell", "amount": 40.0, "type": "expense"},
            {"date": "05/03/2024", "description": "bad date format", "amount": 10.0, "type": "expense"},
            {"date": "2024-03-07", "description": "", "amount": 10.0, "type": "expense"}
        ]"#;
        let recognizer = StatementTextRecognizer::new(MockInference::new(mixed));
        let result = recognizer.recognize("text").await.unwrap();

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.dropped_records, 2);
    }

    #[tokio::test]
    async fn negative_amounts_are_stored_unsigned() {
        let negative = r#"[{"date": "2024-03-05", "description": "Netflix", "amount": -39.9, "type": "expense"}]"#;
        let recognizer = StatementTextRecognizer::new(MockInference::new(negative));
        let result = recognizer.recognize("text").await.unwrap();
        assert_eq!(result.candidates[0].amount_cents, 3990);
    }

    #[tokio::test]
    async fn missing_optional_fields_get_defaults() {
        let minimal = r#"[{"date": "2024-03-05", "description": "Padaria", "amount": 12.5}]"#;
        let recognizer = StatementTextRecognizer::new(MockInference::new(minimal));
        let result = recognizer.recognize("text").await.unwrap();

        let c = &result.candidates[0];
        assert_eq!(c.kind, TransactionKind::Expense);
        assert_eq!(c.category, None);
        assert_eq!(c.confidence, 0.5);
    }

    #[tokio::test]
    async fn unavailable_model_fails_fast() {
        let recognizer =
            StatementTextRecognizer::new(MockInference::new(GOOD_OUTPUT)).with_availability(false);
        let err = recognizer.recognize("text").await.unwrap_err();
        assert!(matches!(err, ModelError::Unavailable));
    }

    #[test]
    fn synthesized_ids_are_stable_and_content_derived() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let a = synthesize_id(date, "Posto Shell", 4000, 0);
        let b = synthesize_id(date, "Posto Shell", 4000, 0);
        let c = synthesize_id(date, "Posto Shell", 4001, 0);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), "pdf-".len() + 16);
    }

    #[test]
    fn identical_records_get_distinct_ids_by_ordinal() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let first = synthesize_id(date, "Cafeteria Central", 850, 0);
        let second = synthesize_id(date, "Cafeteria Central", 850, 1);
        assert_ne!(first, second);
    }
}
