//! Tracker configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/kassa/config/kassa.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Keys missing from an override keep their built-in values. The
//! `KASSA_HOME_CURRENCY` environment variable wins over both layers.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/kassa.toml");

/// Ledger defaults
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    /// ISO-like code assumed when an utterance names no currency
    pub home_currency: String,
    /// Default row count for history views
    pub history_limit: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            home_currency: "KZT".to_string(),
            history_limit: 10,
        }
    }
}

/// Request settings for oracle calls
#[derive(Debug, Clone, PartialEq)]
pub struct OracleConfig {
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            temperature: 0.3,
            max_tokens: Some(200),
        }
    }
}

/// Full tracker configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerConfig {
    pub ledger: LedgerConfig,
    pub oracle: OracleConfig,
    /// Override file this config was read from, if any
    pub source: Option<PathBuf>,
}

impl TrackerConfig {
    /// Load from the default override location, else embedded defaults
    pub fn load() -> Result<Self> {
        let config = match default_config_path() {
            Some(path) if path.exists() => Self::from_path(&path)?,
            _ => parse_config(DEFAULT_CONFIG)?,
        };
        Ok(config.with_env_overrides())
    }

    /// Load from an explicit file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let mut config = parse_config(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Embedded defaults only
    pub fn embedded() -> Result<Self> {
        parse_config(DEFAULT_CONFIG)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(currency) = std::env::var("KASSA_HOME_CURRENCY") {
            let currency = currency.trim().to_uppercase();
            if !currency.is_empty() {
                self.ledger.home_currency = currency;
            }
        }
        self
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("kassa").join("config").join("kassa.toml"))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    ledger: Option<RawLedger>,
    oracle: Option<RawOracle>,
}

#[derive(Debug, Deserialize)]
struct RawLedger {
    home_currency: Option<String>,
    history_limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawOracle {
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

fn parse_config(content: &str) -> Result<TrackerConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = TrackerConfig::default();

    if let Some(ledger) = raw.ledger {
        if let Some(currency) = ledger.home_currency {
            let currency = currency.trim().to_uppercase();
            if currency.is_empty() {
                return Err(Error::Config("ledger.home_currency must not be empty".into()));
            }
            config.ledger.home_currency = currency;
        }
        if let Some(limit) = ledger.history_limit {
            if limit <= 0 {
                return Err(Error::Config("ledger.history_limit must be positive".into()));
            }
            config.ledger.history_limit = limit;
        }
    }

    if let Some(oracle) = raw.oracle {
        if let Some(timeout) = oracle.timeout_secs {
            config.oracle.timeout = Duration::from_secs(timeout.max(1));
        }
        if let Some(temperature) = oracle.temperature {
            config.oracle.temperature = temperature.clamp(0.0, 2.0);
        }
        if let Some(max_tokens) = oracle.max_tokens {
            // 0 means "let the server decide"
            config.oracle.max_tokens = (max_tokens > 0).then_some(max_tokens);
        }
    }

    Ok(config)
}
