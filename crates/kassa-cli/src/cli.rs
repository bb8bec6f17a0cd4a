//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Kassa - Track money by describing it in plain words
#[derive(Parser)]
#[command(name = "kassa")]
#[command(about = "Conversational personal finance tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "kassa.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// User the command acts for
    #[arg(short, long, default_value = "1", global = true)]
    pub user: i64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and register the user
    Init,

    /// Record an expense, income or transfer from a free-form message
    Add {
        /// The message, e.g. "купил кофе 800" or "перевел с каспи на халык 50000"
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },

    /// Show recent transactions
    History {
        /// Number of transactions (defaults to the configured history limit)
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Show transactions of one day
    Day {
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },

    /// Show a single transaction
    Show {
        /// Transaction ID
        id: i64,
    },

    /// Delete a transaction and reverse its balance effect
    Delete {
        /// Transaction ID
        id: i64,
    },

    /// Show account balances
    Balances,

    /// Set the opening balance of an account
    SetBalance {
        /// Account (kaspi, halyk, sber, forte, cash, other or a native name)
        account: String,

        /// Opening balance
        #[arg(allow_hyphen_values = true)]
        amount: f64,
    },

    /// Category statistics
    Stats {
        /// Period: today, week, month, <n>d (e.g. 30d) or YYYY-MM-DD
        #[arg(short, long, default_value = "month")]
        period: String,

        /// Show income categories instead of expenses
        #[arg(long)]
        income: bool,
    },

    /// Income/expense summary
    Summary {
        /// Period: today, week, month, <n>d (e.g. 30d) or YYYY-MM-DD
        #[arg(short, long, default_value = "month")]
        period: String,
    },

    /// Check stored balances against the ledger
    Reconcile {
        /// Rewrite mismatching balances from the ledger
        #[arg(long)]
        fix: bool,
    },

    /// Check the oracle backend
    Oracle,

    /// Show configuration and database status
    Status,

    /// Manage prompt templates
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all prompts and their override status
    List,
    /// Show a prompt's content
    Show {
        /// Prompt ID (e.g. extract_transaction)
        prompt_id: String,
    },
    /// Print the override directory path
    Path,
}
