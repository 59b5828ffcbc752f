pub mod category;
pub mod ledger;
pub mod statement;

pub use category::{categorize, categorize_legacy, Category};
pub use ledger::{Ledger, LedgerError, LedgerTransaction, MemoryLedger};
pub use statement::{
    CandidateTransaction, RawTransaction, Statement, StatementAccount, TransactionKind,
};
