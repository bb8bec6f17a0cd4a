//! Mock backend for testing
//!
//! Replies come from a scripted queue when one is set; otherwise a small
//! keyword heuristic answers so the CLI is usable without a model server.
//! Every request is recorded for assertions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use crate::classify::{classify, UtteranceKind};
use crate::error::{Error, Result};
use crate::models::AccountName;
use crate::normalize::normalize_account;

use super::types::CompletionRequest;
use super::AIBackend;

/// One scripted oracle reply
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Raw text returned as the model output
    Text(String),
    /// Simulated transport failure
    Unavailable(String),
}

/// Mock oracle backend
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Self::default()
        }
    }

    pub fn unhealthy() -> Self {
        Self::default()
    }

    /// Create a mock that answers with `replies` in order
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for reply in replies {
            mock.push(MockReply::Text(reply.into()));
        }
        mock
    }

    /// Queue another reply
    pub fn push(&self, reply: MockReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn next_reply(&self) -> Option<MockReply> {
        self.replies.lock().ok().and_then(|mut r| r.pop_front())
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match self.next_reply() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Unavailable(reason)) => Err(Error::OracleUnavailable(reason)),
            None => Ok(heuristic_reply(&request.user)),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

/// Answer from the quoted message in the prompt
pub(crate) fn heuristic_reply(prompt: &str) -> String {
    let Some(message) = quoted_message(prompt) else {
        return json!({"success": false, "error": "no message in prompt"}).to_string();
    };
    let Some(amount) = first_number(message) else {
        return json!({"success": false, "error": "no amount found"}).to_string();
    };

    let accounts = mentioned_accounts(message);

    if classify(message) == UtteranceKind::Transfer {
        // "снял ... наличными" names only the source bank
        let (source, destination) = match accounts.as_slice() {
            [from, to, ..] => (Some(*from), Some(*to)),
            [only] if *only == AccountName::Cash => (None, Some(AccountName::Cash)),
            [only] => (Some(AccountName::Cash), Some(*only)),
            [] => (None, None),
        };
        return json!({
            "success": true,
            "amount": amount,
            "from_account": source.map(|a| a.as_str()),
            "to_account": destination.map(|a| a.as_str()),
            "description": message,
            "confidence": 0.9,
        })
        .to_string();
    }

    let lowered = message.to_lowercase();
    let (direction, category) = if ["зарплат", "salary", "получил", "доход"]
        .iter()
        .any(|m| lowered.contains(m))
    {
        ("income", "salary")
    } else if ["кофе", "coffee", "еда", "обед", "продукт", "lunch"]
        .iter()
        .any(|m| lowered.contains(m))
    {
        ("expense", "food")
    } else if ["такси", "taxi", "автобус", "бензин"]
        .iter()
        .any(|m| lowered.contains(m))
    {
        ("expense", "transport")
    } else {
        ("expense", "other")
    };

    json!({
        "success": true,
        "amount": amount,
        "category": category,
        "description": message,
        "account": accounts.first().map(|a| a.as_str()),
        "direction": direction,
        "confidence": 0.9,
    })
    .to_string()
}

/// Text between `"` on the line that embeds the message
fn quoted_message(prompt: &str) -> Option<&str> {
    let line = prompt.lines().find(|l| l.contains(": \""))?;
    let start = line.find('"')? + 1;
    let end = line.rfind('"')?;
    (start < end).then(|| &line[start..end])
}

/// First run of digits, allowing spaces between digit groups
fn first_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ' ')
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<f64>().ok().filter(|n| *n > 0.0)
}

/// Known accounts in order of mention
fn mentioned_accounts(text: &str) -> Vec<AccountName> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|word| normalize_account(Some(word)))
        .filter(|a| *a != AccountName::Other)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user: &str) -> CompletionRequest {
        CompletionRequest {
            system: String::new(),
            user: user.to_string(),
        }
    }

    #[tokio::test]
    async fn test_scripted_replies_in_order() {
        let mock = MockBackend::with_replies(["first", "second"]);
        assert_eq!(mock.complete(&request("a")).await.unwrap(), "first");
        assert_eq!(mock.complete(&request("b")).await.unwrap(), "second");
        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.requests()[1].user, "b");
    }

    #[tokio::test]
    async fn test_scripted_unavailable() {
        let mock = MockBackend::new();
        mock.push(MockReply::Unavailable("timeout".into()));
        let err = mock.complete(&request("x")).await.unwrap_err();
        assert!(matches!(err, Error::OracleUnavailable(_)));
    }

    #[test]
    fn test_heuristic_expense() {
        let reply = heuristic_reply("Сообщение: \"купил кофе 800 с каспи\"");
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["amount"], 800.0);
        assert_eq!(value["category"], "food");
        assert_eq!(value["account"], "kaspi");
        assert_eq!(value["direction"], "expense");
    }

    #[test]
    fn test_heuristic_transfer() {
        let reply = heuristic_reply("Сообщение: \"перевел с каспи на халык 50 000\"");
        let value: serde_json::Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["amount"], 50_000.0);
        assert_eq!(value["from_account"], "kaspi");
        assert_eq!(value["to_account"], "halyk");
    }

    #[test]
    fn test_heuristic_without_amount_declines() {
        let reply = heuristic_reply("Сообщение: \"привет\"");
        assert!(reply.contains("\"success\":false"));
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        assert!(MockBackend::new().health_check().await);
        assert!(!MockBackend::unhealthy().health_check().await);
    }
}
