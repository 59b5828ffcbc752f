use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::category::{categorize_legacy, Category};

/// One transaction as parsed from a legacy bank-export file.
///
/// Sign convention: positive `amount_cents` leans credit/income, negative
/// leans debit/expense — but `trn_type` is authoritative when present.
/// Created once per parsed record and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Bank-assigned FITID, unique within the source file.
    pub fit_id: String,
    /// Raw source vocabulary (DEBIT, CREDIT, XFER, …), not normalized.
    pub trn_type: String,
    pub posted: NaiveDate,
    pub amount_cents: i64,
    pub name: String,
    pub memo: Option<String>,
    pub check_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementAccount {
    pub bank_id: Option<String>,
    pub account_id: String,
    pub account_type: String,
}

impl StatementAccount {
    /// Account type tag applied when the source carries none.
    pub const DEFAULT_TYPE: &'static str = "CHECKING";
}

/// One imported file's worth of account + transaction data.
///
/// Transactions keep source-file order, which is not guaranteed to be
/// chronological. A statement with zero transactions is valid — downstream
/// treats it as "nothing to import".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub account: StatementAccount,
    pub transactions: Vec<RawTransaction>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    /// Records dropped by the skip-if-incomplete tolerance policy.
    /// Not an error, but observable.
    pub skipped_records: usize,
}

impl Statement {
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Direction of a candidate transaction. Carries the sign that the unsigned
/// `CandidateTransaction::amount_cents` deliberately does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl TransactionKind {
    /// Case-insensitive mapping from a free-text type string, defaulting to
    /// expense for anything unrecognized.
    pub fn parse_lenient(s: &str) -> TransactionKind {
        match s.trim().to_lowercase().as_str() {
            "income" => TransactionKind::Income,
            "transfer" => TransactionKind::Transfer,
            _ => TransactionKind::Expense,
        }
    }
}

/// Legacy type codes whose presence marks a credit regardless of amount sign.
const CREDIT_TYPE_CODES: &[&str] = &["CREDIT", "DEP", "DIRECTDEP", "INT", "DIV"];

/// A pre-ledger transaction held for review, from either import source.
///
/// Invariant: `amount_cents` is non-negative; direction lives in `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTransaction {
    /// Source-unique identifier: the FITID for legacy files, synthesized for
    /// document imports.
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub kind: TransactionKind,
    pub category: Option<Category>,
    /// Recognition confidence in [0, 1]; 1.0 for structured sources.
    pub confidence: f32,
}

impl CandidateTransaction {
    /// Reconcile the two sign conventions at the parser/categorizer boundary:
    /// the raw amount's sign is dropped and direction is taken from the
    /// source type code, falling back to the sign when the code says nothing.
    pub fn from_raw(raw: &RawTransaction) -> CandidateTransaction {
        let code = raw.trn_type.trim().to_uppercase();
        let kind = if CREDIT_TYPE_CODES.contains(&code.as_str()) {
            TransactionKind::Income
        } else if code == "XFER" {
            TransactionKind::Transfer
        } else if code == "DEBIT" || raw.amount_cents < 0 {
            TransactionKind::Expense
        } else {
            TransactionKind::Income
        };

        CandidateTransaction {
            id: raw.fit_id.clone(),
            date: raw.posted,
            description: raw.name.clone(),
            amount_cents: raw.amount_cents.abs(),
            kind,
            category: Some(categorize_legacy(&raw.trn_type, &raw.name)),
            confidence: 1.0,
        }
    }

    pub fn clamped_confidence(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }

    /// Ledger-convention signed amount: income positive, everything else
    /// negative.
    pub fn signed_amount_cents(&self) -> i64 {
        match self.kind {
            TransactionKind::Income => self.amount_cents,
            TransactionKind::Expense | TransactionKind::Transfer => -self.amount_cents,
        }
    }
}
