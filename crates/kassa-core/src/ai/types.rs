//! Oracle request and candidate types
//!
//! These types are backend-agnostic and used across all oracle implementations.

use serde::Serialize;

use crate::classify::UtteranceKind;

/// One oracle request: a system instruction plus the rendered task prompt
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

/// Which extraction prompt and schema to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    Transaction,
    Transfer,
}

impl From<UtteranceKind> for ExtractionMode {
    fn from(kind: UtteranceKind) -> Self {
        match kind {
            UtteranceKind::Transfer => Self::Transfer,
            UtteranceKind::SingleSided => Self::Transaction,
        }
    }
}

/// Unvalidated single-sided extraction
///
/// Every field is the oracle's guess; `None` means absent or unusable.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionCandidate {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub account: Option<String>,
    pub direction: Option<String>,
    pub confidence: Option<f64>,
}

/// Unvalidated transfer extraction
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransferCandidate {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub source: Option<String>,
    pub destination: Option<String>,
    pub description: Option<String>,
    pub confidence: Option<f64>,
}

/// Output of one extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Candidate {
    Transaction(TransactionCandidate),
    Transfer(TransferCandidate),
}

impl Candidate {
    pub fn amount(&self) -> Option<f64> {
        match self {
            Self::Transaction(c) => c.amount,
            Self::Transfer(c) => c.amount,
        }
    }
}
