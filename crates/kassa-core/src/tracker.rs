//! The tracker service: utterance pipeline plus ledger queries
//!
//! One utterance is one sequential unit of work:
//! classify → extract (the only await) → validate/normalize → append.
//! If the oracle fails nothing is written.

use chrono::{Local, NaiveDate};
use tracing::warn;

use crate::ai::{AIBackend, ExtractionMode, Extractor};
use crate::classify::classify;
use crate::config::TrackerConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    AccountBalance, AccountName, BalanceDiscrepancy, CategoryTotal, Direction, PeriodSummary,
    RejectedDraft, StatsPeriod, Transaction, User,
};
use crate::validate::{validate, Validation, ValidationContext};

/// Result of handling one utterance
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A ledger row was written
    Recorded(Transaction),
    /// The candidate was understood but cannot be persisted as is
    NeedsClarification(RejectedDraft),
}

/// Conversational finance tracker
///
/// Constructed once with its collaborators and passed where needed.
#[derive(Clone)]
pub struct Tracker {
    db: Database,
    extractor: Extractor,
    config: TrackerConfig,
}

impl Tracker {
    pub fn new(db: Database, extractor: Extractor, config: TrackerConfig) -> Self {
        Self {
            db,
            extractor,
            config,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Register a user (or refresh their display fields)
    pub fn register_user(
        &self,
        user_id: i64,
        username: Option<&str>,
        first_name: Option<&str>,
    ) -> Result<User> {
        self.db.upsert_user(
            user_id,
            username,
            first_name,
            &self.config.ledger.home_currency,
        )
    }

    /// Handle a new utterance dated today
    pub async fn record_utterance(&self, user_id: i64, text: &str) -> Result<Outcome> {
        self.record_utterance_on(user_id, text, today()).await
    }

    /// Handle a new utterance with an explicit "today"
    pub async fn record_utterance_on(
        &self,
        user_id: i64,
        text: &str,
        today: NaiveDate,
    ) -> Result<Outcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::LowConfidenceReject("the message is empty".into()));
        }

        let user = self.register_user(user_id, None, None)?;

        let mode = ExtractionMode::from(classify(text));
        let candidate = self
            .extractor
            .extract(text, mode, &user.home_currency)
            .await?;

        let ctx = ValidationContext {
            user_id,
            raw_text: text,
            home_currency: &user.home_currency,
            today,
        };

        match validate(candidate, &ctx) {
            Validation::Valid(new_tx) => {
                let tx = self.db.append_transaction(&new_tx)?;
                Ok(Outcome::Recorded(tx))
            }
            Validation::Draft(draft) => {
                warn!(user_id, reason = %draft.reason, "Candidate needs clarification");
                Ok(Outcome::NeedsClarification(draft))
            }
        }
    }

    /// Most recent transactions; `None` uses the configured history limit
    pub fn recent(&self, user_id: i64, limit: Option<i64>) -> Result<Vec<Transaction>> {
        let limit = limit.unwrap_or(self.config.ledger.history_limit);
        self.db.recent_transactions(user_id, limit)
    }

    pub fn transaction(&self, user_id: i64, id: i64) -> Result<Transaction> {
        self.db.get_transaction(id, user_id)
    }

    pub fn on_date(&self, user_id: i64, date: NaiveDate) -> Result<Vec<Transaction>> {
        self.db.transactions_on(user_id, date)
    }

    pub fn in_range(&self, user_id: i64, from: NaiveDate, to: NaiveDate) -> Result<Vec<Transaction>> {
        self.db.transactions_in_range(user_id, from, to)
    }

    /// Delete a transaction of `user_id` and reverse its balance effect
    pub fn delete(&self, user_id: i64, id: i64) -> Result<Transaction> {
        self.db.delete_transaction(id, user_id)
    }

    pub fn balances(&self, user_id: i64) -> Result<Vec<AccountBalance>> {
        self.db.list_balances(user_id)
    }

    /// Category totals for one direction over a period
    pub fn stats(
        &self,
        user_id: i64,
        period: StatsPeriod,
        direction: Direction,
        today: NaiveDate,
    ) -> Result<Vec<CategoryTotal>> {
        let (from, to) = period.resolve(today);
        self.db.stats_by_category(user_id, from, to, direction)
    }

    pub fn summary(
        &self,
        user_id: i64,
        period: StatsPeriod,
        today: NaiveDate,
    ) -> Result<PeriodSummary> {
        let (from, to) = period.resolve(today);
        self.db.period_summary(user_id, from, to)
    }

    pub fn set_opening_balance(
        &self,
        user_id: i64,
        account: AccountName,
        amount: f64,
    ) -> Result<AccountBalance> {
        if !amount.is_finite() {
            return Err(Error::InvalidData(format!("invalid balance: {}", amount)));
        }
        let user = self.register_user(user_id, None, None)?;
        self.db
            .set_opening_balance(user_id, account, amount, &user.home_currency)
    }

    pub fn reconcile(&self, user_id: i64) -> Result<Vec<BalanceDiscrepancy>> {
        self.db.reconcile_balances(user_id)
    }

    /// Rewrite stored balances from the ledger; returns accounts fixed
    pub fn rebuild_balances(&self, user_id: i64) -> Result<usize> {
        let currency = self
            .db
            .get_user(user_id)?
            .map(|u| u.home_currency)
            .unwrap_or_else(|| self.config.ledger.home_currency.clone());
        self.db.rebuild_balances(user_id, &currency)
    }

    /// Whether the oracle backend answers its health endpoint
    pub async fn oracle_healthy(&self) -> bool {
        self.extractor.client().health_check().await
    }
}

/// Local calendar date used for new rows and relative periods
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
