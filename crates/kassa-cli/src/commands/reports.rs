//! Statistics and summary command implementations

use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use kassa_core::{CategoryTotal, Direction, StatsPeriod, Tracker};

use super::format_amount;

/// Parse a period argument such as `week` or `30d`
pub fn parse_period(period: &str) -> Result<StatsPeriod> {
    period.parse::<StatsPeriod>().map_err(|e| anyhow!(e))
}

pub fn cmd_stats(
    tracker: &Tracker,
    user_id: i64,
    period: &str,
    income: bool,
    today: NaiveDate,
) -> Result<()> {
    let period = parse_period(period)?;
    let (from, to) = period.resolve(today);
    let direction = if income {
        Direction::Income
    } else {
        Direction::Expense
    };

    let totals = tracker.stats(user_id, period, direction, today)?;

    println!();
    println!(
        "📊 {} by category ({} to {})",
        if income { "Income" } else { "Expenses" },
        from,
        to
    );
    println!("   ─────────────────────────────────────────────────");

    if totals.is_empty() {
        println!("   Nothing recorded in this period.");
        return Ok(());
    }

    print_category_totals(&totals);
    Ok(())
}

pub fn cmd_summary(tracker: &Tracker, user_id: i64, period: &str, today: NaiveDate) -> Result<()> {
    let period = parse_period(period)?;
    let summary = tracker.summary(user_id, period, today)?;

    println!();
    println!("📈 Summary {} to {}", summary.from, summary.to);
    println!("   ─────────────────────────────────────────────────");
    println!("   Income:    {:>12}", format_amount(summary.total_income));
    println!("   Expenses:  {:>12}", format_amount(summary.total_expenses));
    println!("   Net:       {:>12}", format_amount(summary.net()));
    println!("   Transfers: {:>12}", summary.transfer_count);

    if !summary.expenses_by_category.is_empty() {
        println!();
        print_category_totals(&summary.expenses_by_category);
    }

    Ok(())
}

fn print_category_totals(totals: &[CategoryTotal]) {
    let grand_total: f64 = totals.iter().map(|t| t.total).sum();
    for t in totals {
        let share = if grand_total > 0.0 {
            t.total / grand_total * 100.0
        } else {
            0.0
        };
        println!(
            "   {} {:<14} │ {:>12} │ {:>3} ops │ {:>5.1}%",
            t.category.emoji(),
            t.category.native_label(),
            format_amount(t.total),
            t.count,
            share
        );
    }
}
