//! Kassa CLI - Conversational finance tracker
//!
//! Usage:
//!   kassa init                          Initialize database
//!   kassa add купил кофе 800            Record a transaction from a message
//!   kassa history --limit 20            Recent transactions
//!   kassa balances                      Account balances
//!   kassa stats --period week           Category statistics

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use kassa_core::today;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let user = cli.user;

    match cli.command {
        Commands::Init => {
            let tracker = commands::open_tracker(&cli.db, false)?;
            commands::cmd_init(&tracker, &cli.db, user)
        }
        Commands::Add { text } => {
            let tracker = commands::open_tracker(&cli.db, true)?;
            commands::cmd_add(&tracker, user, &text.join(" "), today()).await
        }
        Commands::History { limit } => {
            let tracker = commands::open_tracker(&cli.db, false)?;
            commands::cmd_history(&tracker, user, limit)
        }
        Commands::Day { date } => {
            let tracker = commands::open_tracker(&cli.db, false)?;
            let date = commands::parse_date_arg(date.as_deref())?;
            commands::cmd_day(&tracker, user, date)
        }
        Commands::Show { id } => {
            let tracker = commands::open_tracker(&cli.db, false)?;
            commands::cmd_show(&tracker, user, id)
        }
        Commands::Delete { id } => {
            let tracker = commands::open_tracker(&cli.db, false)?;
            commands::cmd_delete(&tracker, user, id)
        }
        Commands::Balances => {
            let tracker = commands::open_tracker(&cli.db, false)?;
            commands::cmd_balances(&tracker, user)
        }
        Commands::SetBalance { account, amount } => {
            let tracker = commands::open_tracker(&cli.db, false)?;
            commands::cmd_set_balance(&tracker, user, &account, amount)
        }
        Commands::Stats { period, income } => {
            let tracker = commands::open_tracker(&cli.db, false)?;
            commands::cmd_stats(&tracker, user, &period, income, today())
        }
        Commands::Summary { period } => {
            let tracker = commands::open_tracker(&cli.db, false)?;
            commands::cmd_summary(&tracker, user, &period, today())
        }
        Commands::Reconcile { fix } => {
            let tracker = commands::open_tracker(&cli.db, false)?;
            commands::cmd_reconcile(&tracker, user, fix)
        }
        Commands::Oracle => commands::cmd_oracle().await,
        Commands::Status => commands::cmd_status(&cli.db, user),
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
    }
}
