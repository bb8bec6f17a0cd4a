//! Balance command implementations (balances, set-balance, reconcile)

use anyhow::{Context, Result};
use kassa_core::{normalize_account, Tracker};

use super::format_amount;

pub fn cmd_balances(tracker: &Tracker, user_id: i64) -> Result<()> {
    let balances = tracker.balances(user_id)?;

    if balances.is_empty() {
        println!("No account balances yet.");
        println!("  Set one with: kassa set-balance kaspi 150000");
        return Ok(());
    }

    println!();
    println!("💳 Balances");
    println!("   ─────────────────────────────────────────");

    let mut total = 0.0;
    for b in &balances {
        total += b.balance;
        let balance_str = if b.balance < 0.0 {
            format!("\x1b[31m{:>14}\x1b[0m", format_amount(b.balance)) // Red when overdrawn
        } else {
            format!("{:>14}", format_amount(b.balance))
        };
        println!("   {:<8} │ {} {}", b.account.as_str(), balance_str, b.currency);
    }

    println!("   ─────────────────────────────────────────");
    println!("   {:<8} │ {:>14}", "total", format_amount(total));

    Ok(())
}

pub fn cmd_set_balance(tracker: &Tracker, user_id: i64, account: &str, amount: f64) -> Result<()> {
    let account = normalize_account(Some(account));
    let balance = tracker
        .set_opening_balance(user_id, account, amount)
        .context("Failed to set opening balance")?;

    println!(
        "✅ {} opening balance set to {} {}",
        balance.account,
        format_amount(balance.opening_balance),
        balance.currency
    );
    println!(
        "   Current balance: {} {}",
        format_amount(balance.balance),
        balance.currency
    );

    Ok(())
}

pub fn cmd_reconcile(tracker: &Tracker, user_id: i64, fix: bool) -> Result<()> {
    let discrepancies = tracker.reconcile(user_id)?;

    if discrepancies.is_empty() {
        println!("✅ All balances match the ledger.");
        return Ok(());
    }

    println!("⚠️  {} account(s) out of sync:", discrepancies.len());
    for d in &discrepancies {
        println!(
            "   {:<8} │ stored {:>12} │ ledger {:>12} │ off by {}",
            d.account.as_str(),
            format_amount(d.stored),
            format_amount(d.expected),
            format_amount(d.difference())
        );
    }

    if fix {
        let fixed = tracker.rebuild_balances(user_id)?;
        println!();
        println!("🔧 Rebuilt {} balance(s) from the ledger.", fixed);
    } else {
        println!();
        println!("   Run 'kassa reconcile --fix' to rebuild them from the ledger.");
    }

    Ok(())
}
