//! Oracle-backed extraction of transaction candidates

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{AccountName, Category};
use crate::prompts::{PromptId, PromptLibrary};

use super::parsing::{parse_transaction_candidate, parse_transfer_candidate};
use super::types::{
    Candidate, CompletionRequest, ExtractionMode, TransactionCandidate, TransferCandidate,
};
use super::{AIBackend, AIClient};

/// Turns an utterance into a candidate with exactly one oracle call
///
/// Failures surface as `OracleUnavailable`, `MalformedResponse` or
/// `LowConfidenceReject`; nothing is ever filled in on the oracle's behalf.
#[derive(Clone)]
pub struct Extractor {
    client: AIClient,
    prompts: Arc<PromptLibrary>,
}

impl Extractor {
    /// Create an extractor using the default prompt library
    pub fn new(client: AIClient) -> Self {
        Self::with_prompts(client, PromptLibrary::new())
    }

    pub fn with_prompts(client: AIClient, prompts: PromptLibrary) -> Self {
        Self {
            client,
            prompts: Arc::new(prompts),
        }
    }

    pub fn client(&self) -> &AIClient {
        &self.client
    }

    /// Extract a candidate using the prompt and schema for `mode`
    ///
    /// `home_currency` is the speaker's default currency; the prompt tells
    /// the oracle to assume it when none is named. Pass `""` to leave it out.
    pub async fn extract(
        &self,
        utterance: &str,
        mode: ExtractionMode,
        home_currency: &str,
    ) -> Result<Candidate> {
        match mode {
            ExtractionMode::Transaction => self
                .extract_transaction(utterance, home_currency)
                .await
                .map(Candidate::Transaction),
            ExtractionMode::Transfer => self
                .extract_transfer(utterance, home_currency)
                .await
                .map(Candidate::Transfer),
        }
    }

    pub async fn extract_transaction(
        &self,
        utterance: &str,
        home_currency: &str,
    ) -> Result<TransactionCandidate> {
        let response = self
            .call(PromptId::ExtractTransaction, utterance, home_currency)
            .await?;
        parse_transaction_candidate(&response).inspect_err(|e| log_rejection(e))
    }

    pub async fn extract_transfer(
        &self,
        utterance: &str,
        home_currency: &str,
    ) -> Result<TransferCandidate> {
        let response = self
            .call(PromptId::ExtractTransfer, utterance, home_currency)
            .await?;
        parse_transfer_candidate(&response).inspect_err(|e| log_rejection(e))
    }

    async fn call(&self, id: PromptId, utterance: &str, home_currency: &str) -> Result<String> {
        let request = self.render(id, utterance, home_currency)?;
        debug!(
            prompt = id.as_str(),
            model = self.client.model(),
            "Sending extraction request"
        );
        let response = self.client.complete(&request).await?;
        debug!(prompt = id.as_str(), "Oracle raw response: {}", response);
        Ok(response)
    }

    fn render(&self, id: PromptId, utterance: &str, home_currency: &str) -> Result<CompletionRequest> {
        let expense = vocabulary(Category::expense_vocabulary());
        let income = vocabulary(Category::income_vocabulary());
        let accounts = AccountName::all()
            .iter()
            .map(|a| a.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let mut vars: HashMap<&str, &str> = HashMap::new();
        vars.insert("text", utterance);
        vars.insert("expense_categories", &expense);
        vars.insert("income_categories", &income);
        vars.insert("accounts", &accounts);
        vars.insert("home_currency", home_currency);

        let rendered = self.prompts.render(id, &vars)?;
        Ok(CompletionRequest {
            system: rendered.system,
            user: rendered.user,
        })
    }
}

/// "food (еда), transport (транспорт), ..."
fn vocabulary(categories: &[Category]) -> String {
    categories
        .iter()
        .map(|c| format!("{} ({})", c.as_str(), c.native_label()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn log_rejection(err: &Error) {
    match err {
        Error::LowConfidenceReject(reason) => warn!(reason = %reason, "Oracle declined extraction"),
        Error::MalformedResponse { reason, raw } => {
            warn!(reason = %reason, raw = %raw, "Unusable oracle response")
        }
        _ => {}
    }
}
