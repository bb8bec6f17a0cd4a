//! Per-account running balances
//!
//! `balance` is always `opening_balance` plus the signed deltas of every
//! undeleted ledger row touching the account. Rows are created lazily on the
//! first write that references an account and are never deleted.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{info, warn};

use super::transactions::ledger_rows;
use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{AccountBalance, AccountName, BalanceDiscrepancy};

/// Balances closer than this are considered equal
const BALANCE_EPSILON: f64 = 1e-6;

/// Add `delta` to an account balance, creating the row on first use
///
/// Runs on the caller's connection so it joins the caller's transaction.
pub(crate) fn apply_delta(
    conn: &Connection,
    user_id: i64,
    account: AccountName,
    delta: f64,
    currency: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        r#"
        INSERT INTO account_balances (user_id, account_name, opening_balance, balance, currency)
        VALUES (?, ?, 0, ?, ?)
        ON CONFLICT(user_id, account_name) DO UPDATE SET
            balance = balance + excluded.balance,
            updated_at = CURRENT_TIMESTAMP
        "#,
        params![user_id, account.as_str(), delta, currency],
    )?;
    Ok(())
}

/// Stored balances of a user, ordered by account name
fn query_balances(conn: &Connection, user_id: i64) -> Result<Vec<AccountBalance>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT user_id, account_name, opening_balance, balance, currency, updated_at
        FROM account_balances
        WHERE user_id = ?
        ORDER BY account_name
        "#,
    )?;
    let rows = stmt.query_map(params![user_id], Database::row_to_balance)?;
    let balances = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(balances.into_iter().flatten().collect())
}

/// opening_balance + signed sum of deltas, per account
fn replay_balances(conn: &Connection, user_id: i64) -> Result<BTreeMap<AccountName, f64>> {
    let mut expected: BTreeMap<AccountName, f64> = query_balances(conn, user_id)?
        .into_iter()
        .map(|b| (b.account, b.opening_balance))
        .collect();

    for tx in ledger_rows(conn, user_id)? {
        for (account, delta) in tx.balance_deltas() {
            *expected.entry(account).or_insert(0.0) += delta;
        }
    }
    Ok(expected)
}

/// Compare stored balances with the replay, reading both through `conn`
fn find_discrepancies(conn: &Connection, user_id: i64) -> Result<Vec<BalanceDiscrepancy>> {
    let expected = replay_balances(conn, user_id)?;
    let stored: BTreeMap<AccountName, f64> = query_balances(conn, user_id)?
        .into_iter()
        .map(|b| (b.account, b.balance))
        .collect();

    let mut accounts: Vec<AccountName> = expected.keys().chain(stored.keys()).copied().collect();
    accounts.sort();
    accounts.dedup();

    Ok(accounts
        .into_iter()
        .filter_map(|account| {
            let stored = stored.get(&account).copied().unwrap_or(0.0);
            let expected = expected.get(&account).copied().unwrap_or(0.0);
            ((stored - expected).abs() > BALANCE_EPSILON).then_some(BalanceDiscrepancy {
                account,
                stored,
                expected,
            })
        })
        .collect())
}

impl Database {
    /// All balances of a user, ordered by account name
    pub fn list_balances(&self, user_id: i64) -> Result<Vec<AccountBalance>> {
        let conn = self.conn()?;
        query_balances(&conn, user_id)
    }

    pub fn get_balance(&self, user_id: i64, account: AccountName) -> Result<Option<AccountBalance>> {
        let conn = self.conn()?;
        let balance = conn
            .query_row(
                r#"
                SELECT user_id, account_name, opening_balance, balance, currency, updated_at
                FROM account_balances
                WHERE user_id = ? AND account_name = ?
                "#,
                params![user_id, account.as_str()],
                Self::row_to_balance,
            )
            .optional()?;
        Ok(balance.flatten())
    }

    /// Set the manually entered starting balance of an account
    ///
    /// The running balance moves by the change in opening balance so ledger
    /// deltas already applied are kept.
    pub fn set_opening_balance(
        &self,
        user_id: i64,
        account: AccountName,
        opening_balance: f64,
        currency: &str,
    ) -> Result<AccountBalance> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO account_balances (user_id, account_name, opening_balance, balance, currency)
            VALUES (?1, ?2, ?3, ?3, ?4)
            ON CONFLICT(user_id, account_name) DO UPDATE SET
                balance = balance + (excluded.opening_balance - opening_balance),
                opening_balance = excluded.opening_balance,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![user_id, account.as_str(), opening_balance, currency],
        )?;
        drop(conn);

        info!(user_id, account = %account, opening_balance, "Opening balance set");
        self.get_balance(user_id, account)?
            .ok_or_else(|| Error::NotFound(format!("balance for {}", account)))
    }

    /// Replay the ledger and report accounts whose stored balance disagrees
    ///
    /// Reads run inside one deferred transaction so the replay and the
    /// stored balances come from the same snapshot.
    pub fn reconcile_balances(&self, user_id: i64) -> Result<Vec<BalanceDiscrepancy>> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;
        let discrepancies = find_discrepancies(&db_tx, user_id)?;
        db_tx.commit()?;

        for d in &discrepancies {
            warn!(
                user_id,
                account = %d.account,
                stored = d.stored,
                expected = d.expected,
                "Balance discrepancy"
            );
        }
        Ok(discrepancies)
    }

    /// Overwrite stored balances with the ledger replay
    ///
    /// The replay runs under the same write lock as the overwrite, so no
    /// append or delete can land in between. Returns the number of accounts
    /// whose balance changed.
    pub fn rebuild_balances(&self, user_id: i64, currency: &str) -> Result<usize> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let discrepancies = find_discrepancies(&db_tx, user_id)?;
        for d in &discrepancies {
            db_tx.execute(
                r#"
                INSERT INTO account_balances (user_id, account_name, opening_balance, balance, currency)
                VALUES (?, ?, 0, ?, ?)
                ON CONFLICT(user_id, account_name) DO UPDATE SET
                    balance = excluded.balance,
                    updated_at = CURRENT_TIMESTAMP
                "#,
                params![user_id, d.account.as_str(), d.expected, currency],
            )?;
        }
        db_tx.commit()?;

        if !discrepancies.is_empty() {
            info!(user_id, fixed = discrepancies.len(), "Balances rebuilt from ledger");
        }
        Ok(discrepancies.len())
    }

    /// Rows with an unknown account name are skipped
    fn row_to_balance(row: &rusqlite::Row) -> rusqlite::Result<Option<AccountBalance>> {
        let account_str: String = row.get(1)?;
        let updated_at: String = row.get(5)?;
        let Ok(account) = account_str.parse::<AccountName>() else {
            return Ok(None);
        };
        Ok(Some(AccountBalance {
            user_id: row.get(0)?,
            account,
            opening_balance: row.get(2)?,
            balance: row.get(3)?,
            currency: row.get(4)?,
            updated_at: parse_datetime(&updated_at),
        }))
    }
}
