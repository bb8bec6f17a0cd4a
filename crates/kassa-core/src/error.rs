//! Error types for Kassa

use thiserror::Error;

/// Maximum length of raw oracle output kept in a diagnostic
const RAW_DIAGNOSTIC_LIMIT: usize = 200;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Transport-level failure talking to the oracle (network, timeout, HTTP status)
    #[error("Oracle unavailable: {0}")]
    OracleUnavailable(String),

    /// Oracle answered, but not with the expected JSON object
    #[error("Malformed oracle response: {reason} | Raw: {raw}")]
    MalformedResponse { reason: String, raw: String },

    /// Oracle explicitly declined with `success: false`
    #[error("Oracle declined: {0}")]
    LowConfidenceReject(String),
}

impl Error {
    /// Build a `MalformedResponse`, truncating the raw oracle text
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        Self::MalformedResponse {
            reason: reason.into(),
            raw: truncate_raw(raw),
        }
    }

    /// Whether this error came from the backing store
    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Pool(_) | Self::Io(_))
    }

    /// Caller-facing text for this error
    ///
    /// Never includes raw oracle output or row details of other users.
    pub fn user_message(&self) -> String {
        match self {
            Self::OracleUnavailable(_) => "Could not analyze the message, please try again.".into(),
            Self::MalformedResponse { .. } => {
                "Could not understand the operation. Try e.g. \"bought coffee 800\".".into()
            }
            Self::LowConfidenceReject(reason) => {
                format!("Could not recognize a financial operation: {}", reason)
            }
            Self::NotFound(_) => "Transaction not found.".into(),
            _ => "Something went wrong, nothing was saved.".into(),
        }
    }
}

fn truncate_raw(raw: &str) -> String {
    if raw.len() <= RAW_DIAGNOSTIC_LIMIT {
        return raw.to_string();
    }
    let mut end = RAW_DIAGNOSTIC_LIMIT;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &raw[..end])
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_truncates_on_char_boundary() {
        let raw = "ж".repeat(300);
        match Error::malformed("bad", &raw) {
            Error::MalformedResponse { raw, .. } => {
                assert!(raw.ends_with("..."));
                assert!(raw.len() <= RAW_DIAGNOSTIC_LIMIT + 3);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_user_message_hides_raw_output() {
        let err = Error::malformed("expected value", "SECRET RAW TEXT");
        assert!(!err.user_message().contains("SECRET"));

        let err = Error::LowConfidenceReject("no amount found".into());
        assert!(err.user_message().contains("no amount found"));
    }

    #[test]
    fn test_storage_failure_classification() {
        let err = Error::Database(rusqlite::Error::QueryReturnedNoRows);
        assert!(err.is_storage_failure());
        assert!(!Error::NotFound("x".into()).is_storage_failure());
    }
}
