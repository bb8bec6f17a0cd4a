//! Kassa Core Library
//!
//! Shared functionality for the Kassa conversational finance tracker:
//! - Utterance classification (transfer vs. single-sided)
//! - Pluggable oracle backends (OpenAI-compatible, Ollama, mock)
//! - Response repair and validation of extracted candidates
//! - Account and category normalization
//! - SQLite ledger with per-account running balances
//! - Prompt library and tracker configuration

pub mod ai;
pub mod classify;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod normalize;
pub mod prompts;
pub mod tracker;
pub mod validate;

/// Test utilities including mock oracle server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AIBackend, AIClient, Candidate, ExtractionMode, Extractor, MockBackend, MockReply,
    OllamaBackend, OpenAICompatibleBackend,
};
pub use classify::{classify, UtteranceKind};
pub use config::{LedgerConfig, OracleConfig, TrackerConfig};
pub use db::Database;
pub use error::{Error, Result};
pub use models::*;
pub use normalize::normalize_account;
pub use prompts::{PromptId, PromptInfo, PromptLibrary};
pub use tracker::{today, Outcome, Tracker};
pub use validate::{validate, Validation, ValidationContext};
