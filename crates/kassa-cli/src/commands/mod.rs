//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `balances` - Balance commands (balances, set-balance, reconcile)
//! - `core` - Core commands (init, oracle, status) and shared utilities (open_tracker)
//! - `prompts` - Prompt library management commands
//! - `reports` - Statistics and summary commands
//! - `transactions` - Transaction commands (add, history, day, show, delete)

pub mod balances;
pub mod core;
pub mod prompts;
pub mod reports;
pub mod transactions;

// Re-export command functions for main.rs
pub use balances::*;
pub use self::core::*;
pub use prompts::*;
pub use reports::*;
pub use transactions::*;

use kassa_core::Transaction;

/// Truncate a string to at most `max` characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Amount with thousands separators, e.g. `50 000` or `800.50`
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    if frac == 0 {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{:02}", sign, grouped, frac)
    }
}

/// One-line listing of a transaction
pub fn format_transaction_line(tx: &Transaction) -> String {
    let sign = match tx.direction() {
        kassa_core::Direction::Expense => "-",
        kassa_core::Direction::Income => "+",
        kassa_core::Direction::Transfer => "",
    };
    let account = tx
        .account_label()
        .map(|a| format!(" [{}]", a))
        .unwrap_or_default();

    format!(
        "[{}] {} │ {}{:>10} {} │ {} {}{}",
        tx.id,
        tx.occurred_at,
        sign,
        format_amount(tx.amount),
        tx.currency,
        tx.category.emoji(),
        truncate(&display_description(tx), 40),
        account
    )
}

/// Description, or the category label when the oracle gave none
fn display_description(tx: &Transaction) -> String {
    if tx.description.trim().is_empty() {
        tx.category.native_label().to_string()
    } else {
        tx.description.clone()
    }
}
