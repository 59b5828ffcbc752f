pub mod db;

pub use db::{create_db, DbPool};

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;

use extrato_core::{Category, Ledger, LedgerError, LedgerTransaction};

/// Ledger implementation over SQLite. Dates are stored as ISO-8601 text,
/// categories as their lower-case labels; an unknown label read back maps to
/// `Other` instead of failing the whole query.
pub struct SqliteLedger {
    pool: DbPool,
}

impl SqliteLedger {
    pub fn new(pool: DbPool) -> Self {
        SqliteLedger { pool }
    }

    pub async fn open(path: &std::path::Path) -> Result<Self, sqlx::Error> {
        Ok(SqliteLedger { pool: create_db(path).await? })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

type LedgerRow = (i64, i64, NaiveDate, String, i64, String, Option<String>);

fn transaction_from_row(row: LedgerRow) -> LedgerTransaction {
    LedgerTransaction {
        id: Some(row.0),
        account_id: row.1,
        date: row.2,
        description: row.3,
        amount_cents: row.4,
        category: Category::from_str(&row.5).unwrap_or(Category::Other),
        fit_id: row.6,
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, account_id, date, description, amount_cents, category, fit_id \
     FROM ledger_transactions";

#[async_trait]
impl Ledger for SqliteLedger {
    async fn transactions_for_account(
        &self,
        account_id: i64,
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let rows = sqlx::query_as::<_, LedgerRow>(&format!(
            "{SELECT_COLUMNS} WHERE account_id = ? ORDER BY date, id"
        ))
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Read(e.to_string()))?;

        Ok(rows.into_iter().map(transaction_from_row).collect())
    }

    async fn transactions_in_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<LedgerTransaction>, LedgerError> {
        let rows = sqlx::query_as::<_, LedgerRow>(&format!(
            "{SELECT_COLUMNS} WHERE date >= ? AND date <= ? ORDER BY date, id"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::Read(e.to_string()))?;

        Ok(rows.into_iter().map(transaction_from_row).collect())
    }

    async fn add_transaction(&self, tx: LedgerTransaction) -> Result<(), LedgerError> {
        sqlx::query(
            "INSERT INTO ledger_transactions \
             (account_id, date, description, amount_cents, category, fit_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(tx.account_id)
        .bind(tx.date)
        .bind(&tx.description)
        .bind(tx.amount_cents)
        .bind(tx.category.to_string())
        .bind(&tx.fit_id)
        .execute(&self.pool)
        .await
        .map_err(|e| LedgerError::Write(e.to_string()))?;
        Ok(())
    }
}
