use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::category::Category;
use crate::statement::CandidateTransaction;

/// A transaction as the ledger stores it. Amounts are signed cents:
/// positive income, negative expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub id: Option<i64>,
    pub account_id: i64,
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub category: Category,
    /// Original source identifier, when the record came from an import.
    pub fit_id: Option<String>,
}

impl LedgerTransaction {
    pub fn from_candidate(candidate: &CandidateTransaction, account_id: i64) -> Self {
        LedgerTransaction {
            id: None,
            account_id,
            date: candidate.date,
            description: candidate.description.clone(),
            amount_cents: candidate.signed_amount_cents(),
            category: candidate.category.unwrap_or(Category::Other),
            fit_id: Some(candidate.id.clone()),
        }
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger read failed: {0}")]
    Read(String),
    #[error("ledger write failed: {0}")]
    Write(String),
}

/// The ledger collaborator boundary. The import pipeline only ever reads
/// existing records and appends new ones — no updates, no deletes.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn transactions_for_account(
        &self,
        account_id: i64,
    ) -> Result<Vec<LedgerTransaction>, LedgerError>;

    async fn transactions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LedgerTransaction>, LedgerError>;

    async fn add_transaction(&self, tx: LedgerTransaction) -> Result<(), LedgerError>;
}

/// In-memory ledger used by tests and as a reference implementation.
#[derive(Default)]
pub struct MemoryLedger {
    inner: std::sync::Mutex<Vec<LedgerTransaction>>,
    /// When set, `add_transaction` fails for candidates with this fit_id.
    /// Lets tests exercise partial-commit reporting.
    pub fail_fit_id: Option<String>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transactions(txs: Vec<LedgerTransaction>) -> Self {
        MemoryLedger {
            inner: std::sync::Mutex::new(txs),
            fail_fit_id: None,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn transactions_for_account(
        &self,
        account_id: i64,
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| LedgerError::Read(e.to_string()))?;
        Ok(inner
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect())
    }

    async fn transactions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let inner = self
            .inner
            .lock()
            .map_err(|e| LedgerError::Read(e.to_string()))?;
        Ok(inner
            .iter()
            .filter(|t| t.date >= start && t.date <= end)
            .cloned()
            .collect())
    }

    async fn add_transaction(&self, tx: LedgerTransaction) -> Result<(), LedgerError> {
        if let (Some(fail), Some(fit)) = (&self.fail_fit_id, &tx.fit_id) {
            if fail == fit {
                return Err(LedgerError::Write(format!("injected failure for {fit}")));
            }
        }
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| LedgerError::Write(e.to_string()))?;
        let mut tx = tx;
        tx.id = Some(inner.len() as i64 + 1);
        inner.push(tx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(account_id: i64, d: NaiveDate, desc: &str, cents: i64) -> LedgerTransaction {
        LedgerTransaction {
            id: None,
            account_id,
            date: d,
            description: desc.to_string(),
            amount_cents: cents,
            category: Category::Other,
            fit_id: None,
        }
    }

    #[tokio::test]
    async fn memory_ledger_filters_by_account() {
        let ledger = MemoryLedger::new();
        ledger
            .add_transaction(tx(1, date(2024, 1, 15), "A", -100))
            .await
            .unwrap();
        ledger
            .add_transaction(tx(2, date(2024, 1, 16), "B", -200))
            .await
            .unwrap();

        let found = ledger.transactions_for_account(1).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].description, "A");
        assert_eq!(found[0].id, Some(1));
    }

    #[tokio::test]
    async fn memory_ledger_filters_by_range_inclusive() {
        let ledger = MemoryLedger::new();
        for d in 10..=20 {
            ledger
                .add_transaction(tx(1, date(2024, 1, d), "X", -1))
                .await
                .unwrap();
        }
        let found = ledger
            .transactions_in_range(date(2024, 1, 12), date(2024, 1, 14))
            .await
            .unwrap();
        assert_eq!(found.len(), 3);
    }

    #[tokio::test]
    async fn injected_write_failure_is_scoped_to_one_fit_id() {
        let mut ledger = MemoryLedger::new();
        ledger.fail_fit_id = Some("BAD".to_string());

        let mut bad = tx(1, date(2024, 1, 15), "bad", -1);
        bad.fit_id = Some("BAD".to_string());
        let mut good = tx(1, date(2024, 1, 15), "good", -1);
        good.fit_id = Some("GOOD".to_string());

        assert!(ledger.add_transaction(bad).await.is_err());
        assert!(ledger.add_transaction(good).await.is_ok());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn from_candidate_signs_amount_and_keeps_source_id() {
        use crate::statement::{RawTransaction, TransactionKind};

        let raw = RawTransaction {
            fit_id: "TXN9".to_string(),
            trn_type: "DEBIT".to_string(),
            posted: date(2024, 2, 1),
            amount_cents: -4250,
            name: "Posto Shell".to_string(),
            memo: None,
            check_number: None,
        };
        let cand = CandidateTransaction::from_raw(&raw);
        assert_eq!(cand.kind, TransactionKind::Expense);

        let ledger_tx = LedgerTransaction::from_candidate(&cand, 7);
        assert_eq!(ledger_tx.amount_cents, -4250);
        assert_eq!(ledger_tx.account_id, 7);
        assert_eq!(ledger_tx.fit_id.as_deref(), Some("TXN9"));
        assert_eq!(ledger_tx.category, Category::Transport);
    }
}
