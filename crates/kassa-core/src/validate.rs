//! Candidate validation
//!
//! Repairs an oracle candidate into a ledger-ready [`NewTransaction`], or a
//! [`RejectedDraft`] when no amount can be trusted. Implausible fields are
//! replaced with defaults and cost confidence instead of failing.

use chrono::NaiveDate;

use crate::ai::{Candidate, TransactionCandidate, TransferCandidate};
use crate::models::{Category, Direction, Movement, NewTransaction, RejectedDraft};
use crate::normalize::{normalize_account, normalize_optional};

/// Multiplier applied when the category falls outside the vocabulary
pub const CATEGORY_PENALTY: f64 = 0.8;

const AMOUNT_REASON: &str = "amount missing or not positive";
const SAME_ACCOUNT_REASON: &str = "source and destination are the same account";

/// Caller-supplied facts the candidate cannot know
#[derive(Debug, Clone)]
pub struct ValidationContext<'a> {
    pub user_id: i64,
    pub raw_text: &'a str,
    pub home_currency: &'a str,
    pub today: NaiveDate,
}

/// Result of validating one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Valid(NewTransaction),
    Draft(RejectedDraft),
}

impl Validation {
    pub fn is_persistable(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

pub fn validate(candidate: Candidate, ctx: &ValidationContext<'_>) -> Validation {
    match candidate {
        Candidate::Transaction(c) => validate_transaction(c, ctx),
        Candidate::Transfer(c) => validate_transfer(c, ctx),
    }
}

pub fn validate_transaction(c: TransactionCandidate, ctx: &ValidationContext<'_>) -> Validation {
    let currency = resolve_currency(c.currency.as_deref(), ctx.home_currency);
    let mut confidence = resolve_confidence(c.confidence);

    let direction = match c.direction.as_deref().map(str::parse::<Direction>) {
        Some(Ok(Direction::Income)) => Direction::Income,
        _ => Direction::Expense,
    };

    let category = match c.category.as_deref().map(str::parse::<Category>) {
        Some(Ok(category)) if category.is_valid_for(direction) => category,
        _ => {
            confidence *= CATEGORY_PENALTY;
            Category::Other
        }
    };

    let account = normalize_optional(c.account.as_deref());
    let movement = match direction {
        Direction::Income => Movement::Income { account },
        _ => Movement::Expense { account },
    };
    let description = c.description.unwrap_or_default();

    match positive_amount(c.amount) {
        Some(amount) => Validation::Valid(NewTransaction {
            user_id: ctx.user_id,
            amount,
            currency,
            category,
            description,
            movement,
            confidence: clamp_unit(confidence),
            raw_text: ctx.raw_text.to_string(),
            occurred_at: ctx.today,
        }),
        None => Validation::Draft(RejectedDraft {
            amount: c.amount,
            currency,
            category,
            description,
            direction,
            account_label: movement.account_label(),
            confidence: clamp_unit(confidence),
            raw_text: ctx.raw_text.to_string(),
            reason: AMOUNT_REASON.to_string(),
        }),
    }
}

pub fn validate_transfer(c: TransferCandidate, ctx: &ValidationContext<'_>) -> Validation {
    let currency = resolve_currency(c.currency.as_deref(), ctx.home_currency);
    let confidence = resolve_confidence(c.confidence);
    let movement = Movement::Transfer {
        source: normalize_account(c.source.as_deref()),
        destination: normalize_account(c.destination.as_deref()),
    };
    let description = c.description.unwrap_or_default();

    let amount = positive_amount(c.amount);
    let reason = match (amount, movement) {
        (None, _) => Some(AMOUNT_REASON),
        (
            Some(_),
            Movement::Transfer {
                source,
                destination,
            },
        ) if source == destination => Some(SAME_ACCOUNT_REASON),
        _ => None,
    };

    match (amount, reason) {
        (Some(amount), None) => Validation::Valid(NewTransaction {
            user_id: ctx.user_id,
            amount,
            currency,
            category: Category::Transfer,
            description,
            movement,
            confidence,
            raw_text: ctx.raw_text.to_string(),
            occurred_at: ctx.today,
        }),
        (_, reason) => Validation::Draft(RejectedDraft {
            amount: c.amount,
            currency,
            category: Category::Transfer,
            description,
            direction: Direction::Transfer,
            account_label: movement.account_label(),
            confidence,
            raw_text: ctx.raw_text.to_string(),
            reason: reason.unwrap_or(AMOUNT_REASON).to_string(),
        }),
    }
}

fn positive_amount(amount: Option<f64>) -> Option<f64> {
    amount.filter(|a| a.is_finite() && *a > 0.0)
}

fn resolve_currency(raw: Option<&str>, home: &str) -> String {
    match raw.map(str::trim) {
        Some(c) if !c.is_empty() => c.to_uppercase(),
        _ => home.to_string(),
    }
}

fn resolve_confidence(raw: Option<f64>) -> f64 {
    clamp_unit(raw.filter(|c| c.is_finite()).unwrap_or(1.0))
}

fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountName;

    fn ctx() -> ValidationContext<'static> {
        ValidationContext {
            user_id: 7,
            raw_text: "raw",
            home_currency: "KZT",
            today: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        }
    }

    fn expect_valid(v: Validation) -> NewTransaction {
        match v {
            Validation::Valid(tx) => tx,
            Validation::Draft(d) => panic!("unexpected draft: {:?}", d),
        }
    }

    fn expect_draft(v: Validation) -> RejectedDraft {
        match v {
            Validation::Draft(d) => d,
            Validation::Valid(tx) => panic!("unexpected valid: {:?}", tx),
        }
    }

    #[test]
    fn test_valid_expense() {
        let tx = expect_valid(validate_transaction(
            TransactionCandidate {
                amount: Some(800.0),
                currency: Some(" kzt ".into()),
                category: Some("еда".into()),
                description: Some("кофе".into()),
                account: Some("Kaspi Gold".into()),
                direction: Some("expense".into()),
                confidence: Some(0.95),
            },
            &ctx(),
        ));
        assert_eq!(tx.amount, 800.0);
        assert_eq!(tx.currency, "KZT");
        assert_eq!(tx.category, Category::Food);
        assert_eq!(
            tx.movement,
            Movement::Expense {
                account: Some(AccountName::Kaspi)
            }
        );
        assert_eq!(tx.confidence, 0.95);
        assert_eq!(tx.raw_text, "raw");
        assert_eq!(tx.user_id, 7);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let tx = expect_valid(validate_transaction(
            TransactionCandidate {
                amount: Some(1500.0),
                category: Some("transport".into()),
                ..Default::default()
            },
            &ctx(),
        ));
        assert_eq!(tx.currency, "KZT");
        assert_eq!(tx.confidence, 1.0);
        assert_eq!(tx.movement, Movement::Expense { account: None });
        assert_eq!(tx.description, "");
        assert_eq!(tx.occurred_at, ctx().today);
    }

    #[test]
    fn test_non_positive_amounts_never_persist() {
        for amount in [None, Some(0.0), Some(-5.0), Some(f64::NAN), Some(f64::INFINITY)] {
            let draft = expect_draft(validate_transaction(
                TransactionCandidate {
                    amount,
                    category: Some("food".into()),
                    ..Default::default()
                },
                &ctx(),
            ));
            assert_eq!(draft.reason, AMOUNT_REASON);
            assert_eq!(draft.category, Category::Food);
        }
    }

    #[test]
    fn test_unknown_category_penalized() {
        let tx = expect_valid(validate_transaction(
            TransactionCandidate {
                amount: Some(100.0),
                category: Some("crypto".into()),
                confidence: Some(0.5),
                ..Default::default()
            },
            &ctx(),
        ));
        assert_eq!(tx.category, Category::Other);
        assert!((tx.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_category_checked_against_resolved_direction() {
        // salary is not an expense category; direction defaults to expense
        let tx = expect_valid(validate_transaction(
            TransactionCandidate {
                amount: Some(100.0),
                category: Some("salary".into()),
                direction: Some("refund".into()),
                ..Default::default()
            },
            &ctx(),
        ));
        assert_eq!(tx.movement.direction(), Direction::Expense);
        assert_eq!(tx.category, Category::Other);
        assert!((tx.confidence - CATEGORY_PENALTY).abs() < 1e-9);

        let tx = expect_valid(validate_transaction(
            TransactionCandidate {
                amount: Some(450_000.0),
                category: Some("зарплата".into()),
                direction: Some("income".into()),
                account: Some("каспи".into()),
                ..Default::default()
            },
            &ctx(),
        ));
        assert_eq!(tx.category, Category::Salary);
        assert_eq!(
            tx.movement,
            Movement::Income {
                account: Some(AccountName::Kaspi)
            }
        );
    }

    #[test]
    fn test_confidence_clamped() {
        let tx = expect_valid(validate_transaction(
            TransactionCandidate {
                amount: Some(1.0),
                category: Some("food".into()),
                confidence: Some(7.0),
                ..Default::default()
            },
            &ctx(),
        ));
        assert_eq!(tx.confidence, 1.0);
    }

    #[test]
    fn test_valid_transfer() {
        let tx = expect_valid(validate_transfer(
            TransferCandidate {
                amount: Some(50_000.0),
                source: Some("каспи".into()),
                destination: Some("Halyk".into()),
                ..Default::default()
            },
            &ctx(),
        ));
        assert_eq!(tx.category, Category::Transfer);
        assert_eq!(
            tx.movement.account_label().as_deref(),
            Some("kaspi → halyk")
        );
    }

    #[test]
    fn test_transfer_missing_accounts_become_other() {
        let tx = expect_valid(validate_transfer(
            TransferCandidate {
                amount: Some(20_000.0),
                source: Some("halyk".into()),
                destination: None,
                ..Default::default()
            },
            &ctx(),
        ));
        assert_eq!(tx.movement.destination(), Some(AccountName::Other));
    }

    #[test]
    fn test_same_account_transfer_is_draft() {
        let draft = expect_draft(validate_transfer(
            TransferCandidate {
                amount: Some(1000.0),
                source: Some("kaspi".into()),
                destination: Some("Kaspi Gold".into()),
                ..Default::default()
            },
            &ctx(),
        ));
        assert_eq!(draft.reason, SAME_ACCOUNT_REASON);
        assert_eq!(draft.direction, Direction::Transfer);
    }

    #[test]
    fn test_transfer_without_amount_is_draft() {
        let draft = expect_draft(validate(
            Candidate::Transfer(TransferCandidate {
                amount: Some(0.0),
                source: Some("kaspi".into()),
                destination: Some("halyk".into()),
                ..Default::default()
            }),
            &ctx(),
        ));
        assert_eq!(draft.reason, AMOUNT_REASON);
        assert_eq!(draft.amount, Some(0.0));
    }
}
