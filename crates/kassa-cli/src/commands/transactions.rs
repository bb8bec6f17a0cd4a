//! Transaction command implementations

use anyhow::{Context, Result};
use chrono::NaiveDate;
use kassa_core::{Error, Outcome, Tracker};

use super::{format_amount, format_transaction_line};

pub async fn cmd_add(tracker: &Tracker, user_id: i64, text: &str, today: NaiveDate) -> Result<()> {
    let outcome = match tracker.record_utterance_on(user_id, text, today).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_storage_failure() => {
            return Err(e).context("Failed to record transaction");
        }
        Err(e) => {
            print_rejection(&e);
            return Ok(());
        }
    };

    match outcome {
        Outcome::Recorded(tx) => {
            println!("✅ Recorded:");
            println!("   {}", format_transaction_line(&tx));
            println!(
                "   {} {} │ confidence {:.0}%",
                tx.category.emoji(),
                tx.category.native_label(),
                tx.confidence * 100.0
            );
            for (account, delta) in tx.balance_deltas() {
                if let Some(balance) = tracker.db().get_balance(user_id, account)? {
                    println!(
                        "   {} {:+.2} → {} {}",
                        account,
                        delta,
                        format_amount(balance.balance),
                        balance.currency
                    );
                }
            }
        }
        Outcome::NeedsClarification(draft) => {
            println!("🤔 Not saved: {}", draft.reason);
            if let Some(amount) = draft.amount {
                println!("   Understood amount: {} {}", format_amount(amount), draft.currency);
            }
            if let Some(account) = draft.account_label {
                println!("   Account: {}", account);
            }
            println!("   Try rephrasing, e.g. \"купил кофе 800 с каспи\".");
        }
    }

    Ok(())
}

fn print_rejection(e: &Error) {
    println!("❌ {}", e.user_message());
    tracing::debug!(error = %e, "Utterance rejected");
}

pub fn cmd_history(tracker: &Tracker, user_id: i64, limit: Option<i64>) -> Result<()> {
    let transactions = tracker.recent(user_id, limit)?;

    if transactions.is_empty() {
        println!("No transactions yet. Record one with:");
        println!("  kassa add купил кофе 800");
        return Ok(());
    }

    println!();
    println!("📝 Recent Transactions");
    println!("   ─────────────────────────────────────────────────────────────");
    for tx in &transactions {
        println!("   {}", format_transaction_line(tx));
    }

    Ok(())
}

pub fn cmd_day(tracker: &Tracker, user_id: i64, date: NaiveDate) -> Result<()> {
    let transactions = tracker.on_date(user_id, date)?;

    println!();
    println!("📅 {}", date);
    println!("   ─────────────────────────────────────────────────────────────");

    if transactions.is_empty() {
        println!("   No transactions.");
        return Ok(());
    }

    let mut spent = 0.0;
    let mut earned = 0.0;
    for tx in &transactions {
        println!("   {}", format_transaction_line(tx));
        match tx.direction() {
            kassa_core::Direction::Expense => spent += tx.amount,
            kassa_core::Direction::Income => earned += tx.amount,
            kassa_core::Direction::Transfer => {}
        }
    }

    println!();
    println!("   Spent:  {}", format_amount(spent));
    println!("   Earned: {}", format_amount(earned));

    Ok(())
}

pub fn cmd_show(tracker: &Tracker, user_id: i64, id: i64) -> Result<()> {
    let tx = match tracker.transaction(user_id, id) {
        Ok(tx) => tx,
        Err(e @ Error::NotFound(_)) => {
            println!("❌ {}", e.user_message());
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Transaction {}", tx.id);
    println!("   Date:        {}", tx.occurred_at);
    println!("   Amount:      {} {}", format_amount(tx.amount), tx.currency);
    println!("   Direction:   {}", tx.direction().as_str());
    println!(
        "   Category:    {} {}",
        tx.category.emoji(),
        tx.category.native_label()
    );
    println!(
        "   Account:     {}",
        tx.account_label().unwrap_or_else(|| "-".to_string())
    );
    println!("   Description: {}", tx.description);
    println!("   Confidence:  {:.0}%", tx.confidence * 100.0);
    println!("   Message:     {}", tx.raw_text);
    println!("   Created:     {}", tx.created_at.format("%Y-%m-%d %H:%M:%S"));

    Ok(())
}

pub fn cmd_delete(tracker: &Tracker, user_id: i64, id: i64) -> Result<()> {
    match tracker.delete(user_id, id) {
        Ok(tx) => {
            println!("🗑️  Deleted transaction {}:", id);
            println!("   {}", format_transaction_line(&tx));
            if !tx.balance_deltas().is_empty() {
                println!("   Account balances were adjusted back.");
            }
            Ok(())
        }
        Err(e @ Error::NotFound(_)) => {
            println!("❌ {}", e.user_message());
            Ok(())
        }
        Err(e) => Err(e).context("Failed to delete transaction"),
    }
}
