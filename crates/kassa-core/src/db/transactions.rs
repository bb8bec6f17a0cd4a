//! Ledger row operations
//!
//! Every write runs in one `BEGIN IMMEDIATE` transaction together with the
//! balance adjustments it implies, so a row and its balance effect are
//! either both visible or neither is.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::info;

use super::balances::apply_delta;
use super::{format_date, parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{AccountName, Category, Direction, Movement, NewTransaction, Transaction};

const TX_COLUMNS: &str = "id, user_id, amount, currency, category, description, account, \
     destination_account, direction, confidence, raw_text, occurred_at, created_at";

/// Every transaction of a user, oldest first (ledger replay order)
///
/// Takes a connection so a replay can share the caller's transaction.
pub(crate) fn ledger_rows(conn: &Connection, user_id: i64) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM transactions WHERE user_id = ? ORDER BY id",
        TX_COLUMNS
    ))?;
    let rows = stmt.query_map(params![user_id], Database::row_to_transaction)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

impl Database {
    /// Insert a validated transaction and apply its balance deltas
    pub fn append_transaction(&self, tx: &NewTransaction) -> Result<Transaction> {
        check_new_transaction(tx)?;

        let mut conn = self.conn()?;
        let db_tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        db_tx.execute(
            r#"
            INSERT INTO transactions (user_id, amount, currency, category, description, account,
                                      destination_account, direction, confidence, raw_text, occurred_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                tx.user_id,
                tx.amount,
                tx.currency,
                tx.category.as_str(),
                tx.description,
                tx.movement.account().map(|a| a.as_str()),
                tx.movement.destination().map(|a| a.as_str()),
                tx.movement.direction().as_str(),
                tx.confidence,
                tx.raw_text,
                format_date(tx.occurred_at),
            ],
        )?;
        let id = db_tx.last_insert_rowid();

        for (account, delta) in tx.movement.balance_deltas(tx.amount) {
            apply_delta(&db_tx, tx.user_id, account, delta, &tx.currency)?;
        }

        let stored = db_tx.query_row(
            &format!("SELECT {} FROM transactions WHERE id = ?", TX_COLUMNS),
            params![id],
            Self::row_to_transaction,
        )?;
        db_tx.commit()?;

        info!(
            id,
            user_id = tx.user_id,
            direction = %tx.movement.direction(),
            amount = tx.amount,
            "Transaction recorded"
        );
        Ok(stored)
    }

    /// Get a transaction owned by `user_id`
    ///
    /// Rows of other users are reported as not found.
    pub fn get_transaction(&self, id: i64, user_id: i64) -> Result<Transaction> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM transactions WHERE id = ? AND user_id = ?",
                TX_COLUMNS
            ),
            params![id, user_id],
            Self::row_to_transaction,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))
    }

    /// Most recent transactions, newest first
    pub fn recent_transactions(&self, user_id: i64, limit: i64) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM transactions WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?",
            TX_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id, limit.max(0)], Self::row_to_transaction)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Transactions that occurred on `date`, newest first
    pub fn transactions_on(&self, user_id: i64, date: NaiveDate) -> Result<Vec<Transaction>> {
        self.transactions_in_range(user_id, date, date)
    }

    /// Transactions that occurred within `[from, to]`, newest first
    pub fn transactions_in_range(
        &self,
        user_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {} FROM transactions
            WHERE user_id = ? AND occurred_at >= ? AND occurred_at <= ?
            ORDER BY created_at DESC, id DESC
            "#,
            TX_COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![user_id, format_date(from), format_date(to)],
            Self::row_to_transaction,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Hard-delete a transaction and reverse its balance deltas
    ///
    /// Returns the deleted row.
    pub fn delete_transaction(&self, id: i64, user_id: i64) -> Result<Transaction> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing = db_tx
            .query_row(
                &format!(
                    "SELECT {} FROM transactions WHERE id = ? AND user_id = ?",
                    TX_COLUMNS
                ),
                params![id, user_id],
                Self::row_to_transaction,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))?;

        db_tx.execute(
            "DELETE FROM transactions WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;

        for (account, delta) in existing.balance_deltas() {
            apply_delta(&db_tx, user_id, account, -delta, &existing.currency)?;
        }
        db_tx.commit()?;

        info!(id, user_id, "Transaction deleted, balances reversed");
        Ok(existing)
    }

    pub fn count_transactions(&self, user_id: i64) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub(crate) fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        let category_str: String = row.get(4)?;
        let account_str: Option<String> = row.get(6)?;
        let destination_str: Option<String> = row.get(7)?;
        let direction_str: String = row.get(8)?;
        let occurred_str: String = row.get(11)?;
        let created_at_str: String = row.get(12)?;

        let direction = direction_str.parse().unwrap_or(Direction::Expense);
        let account = account_str.and_then(|s| s.parse::<AccountName>().ok());
        let destination = destination_str.and_then(|s| s.parse::<AccountName>().ok());

        Ok(Transaction {
            id: row.get(0)?,
            user_id: row.get(1)?,
            amount: row.get(2)?,
            currency: row.get(3)?,
            category: category_str.parse().unwrap_or(Category::Other),
            description: row.get(5)?,
            movement: Movement::from_columns(direction, account, destination),
            confidence: row.get(9)?,
            raw_text: row.get(10)?,
            occurred_at: parse_date(&occurred_str),
            created_at: parse_datetime(&created_at_str),
        })
    }
}

/// Ledger-level invariants a `NewTransaction` must satisfy
fn check_new_transaction(tx: &NewTransaction) -> Result<()> {
    if !(tx.amount.is_finite() && tx.amount > 0.0) {
        return Err(Error::InvalidData(format!(
            "amount must be positive, got {}",
            tx.amount
        )));
    }
    let direction = tx.movement.direction();
    if !tx.category.is_valid_for(direction) {
        return Err(Error::InvalidData(format!(
            "category {} is not valid for {}",
            tx.category, direction
        )));
    }
    if let Movement::Transfer {
        source,
        destination,
    } = tx.movement
    {
        if source == destination {
            return Err(Error::InvalidData(format!(
                "transfer from {} to itself",
                source
            )));
        }
    }
    Ok(())
}
