//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_tracker` - Shared utility to build the tracker service
//! - `cmd_init` - Initialize the database
//! - `cmd_oracle` - Check the oracle backend
//! - `cmd_status` - Show configuration and database status

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use kassa_core::{AIBackend, AIClient, Database, Extractor, Tracker, TrackerConfig};

/// Open the database at `db_path`
pub fn open_db(db_path: &Path) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

/// Build the tracker from the database, config and oracle environment
///
/// Commands that only read the ledger never call the oracle, so they get
/// the mock backend when no oracle is configured.
pub fn open_tracker(db_path: &Path, require_oracle: bool) -> Result<Tracker> {
    let config = TrackerConfig::load().context("Failed to load configuration")?;
    let db = open_db(db_path)?;

    let client = match AIClient::from_env_with(&config.oracle) {
        Some(client) => client,
        None if require_oracle => bail!(
            "No oracle configured. Set OPENAI_COMPATIBLE_HOST, or AI_BACKEND=ollama with OLLAMA_HOST"
        ),
        None => AIClient::mock(),
    };

    tracing::debug!(
        backend = client.backend_name(),
        model = client.model(),
        host = client.host(),
        "Oracle client ready"
    );

    Ok(Tracker::new(db, Extractor::new(client), config))
}

/// Parse an optional `YYYY-MM-DD` argument, defaulting to today
pub fn parse_date_arg(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("Invalid date '{}' (use YYYY-MM-DD)", s)),
        None => Ok(kassa_core::today()),
    }
}

pub fn cmd_init(tracker: &Tracker, db_path: &Path, user_id: i64) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let user = tracker
        .register_user(user_id, None, None)
        .context("Failed to register user")?;
    println!("   Registered user {} (home currency {})", user.user_id, user.home_currency);

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Configure the oracle: export OPENAI_COMPATIBLE_HOST=http://localhost:8080");
    println!("  2. Record something: kassa add купил кофе 800");
    println!("  3. Check balances: kassa balances");

    Ok(())
}

pub async fn cmd_oracle() -> Result<()> {
    let config = TrackerConfig::load().context("Failed to load configuration")?;

    let Some(client) = AIClient::from_env_with(&config.oracle) else {
        println!("❌ No oracle configured");
        println!();
        println!("   Set one of:");
        println!("     OPENAI_COMPATIBLE_HOST (+ OPENAI_COMPATIBLE_MODEL, OPENAI_COMPATIBLE_API_KEY)");
        println!("     AI_BACKEND=ollama with OLLAMA_HOST (+ OLLAMA_MODEL)");
        println!("     AI_BACKEND=mock");
        return Ok(());
    };

    println!("🤖 Oracle");
    println!("   ─────────────────────────────");
    println!("   Backend: {}", client.backend_name());
    println!("   Host:    {}", client.host());
    println!("   Model:   {}", client.model());
    println!("   Timeout: {}s", config.oracle.timeout.as_secs());

    if client.health_check().await {
        println!("   ✅ Reachable");
    } else {
        println!("   ❌ Not reachable");
    }

    Ok(())
}

pub fn cmd_status(db_path: &Path, user_id: i64) -> Result<()> {
    let config = TrackerConfig::load().context("Failed to load configuration")?;

    println!();
    println!("📊 Kassa Status");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Database: {}", db_path.display());
    println!(
        "   Config: {}",
        config
            .source
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(embedded defaults)".to_string())
    );
    println!("   Home currency: {}", config.ledger.home_currency);
    println!("   History limit: {}", config.ledger.history_limit);

    let oracle = AIClient::from_env_with(&config.oracle)
        .map(|c| format!("{} ({} @ {})", c.backend_name(), c.model(), c.host()))
        .unwrap_or_else(|| "(not configured)".to_string());
    println!("   Oracle: {}", oracle);

    if !db_path.exists() {
        println!();
        println!("   Database not initialized. Run 'kassa init'.");
        return Ok(());
    }

    let db = open_db(db_path)?;
    println!();
    match db.get_user(user_id)? {
        Some(user) => println!(
            "   User {}: {} transactions, {} accounts",
            user.user_id,
            db.count_transactions(user_id)?,
            db.list_balances(user_id)?.len()
        ),
        None => println!("   User {} has no records yet.", user_id),
    }

    Ok(())
}
