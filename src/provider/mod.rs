//! Providers: the boundary to a generative backend.
//!
//! The console depends only on the two traits here. `anthropic` implements
//! both over the Anthropic Messages API; `OfflineProvider` stands in when no
//! credential is configured.

pub mod anthropic;
pub mod types;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Input to an inference call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceRequest {
    /// Catalog id of the model being addressed.
    pub model_id: String,
    pub prompt: String,
    /// Behavior instruction (system prompt), if any.
    pub instruction: Option<String>,
}

/// Successful inference output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceReply {
    pub text: String,
}

/// One optimizer tip returned by the advice provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdviceTip {
    pub title: String,
    pub content: String,
}

/// Errors from provider calls.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("missing API key: {0}")]
    MissingApiKey(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

/// Answers a single prompt.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceReply, ProviderError>;
}

/// Suggests fine-tuning tips. Never fails: any problem yields an empty list.
#[async_trait]
pub trait AdviceProvider: Send + Sync {
    async fn advise(&self, tier: &str, dataset: &str) -> Vec<AdviceTip>;
}

/// Prompt sent to the advice backend.
pub fn advice_prompt(tier: &str, dataset: &str) -> String {
    format!(
        "I am fine-tuning a {tier} on a dataset that contains: {dataset}. \
Provide 3 specific advice tips for hyperparameters (epochs, learning rate, batch size) \
and potential pitfalls to avoid. Respond with only a JSON array of objects with \
\"title\" and \"content\" string fields."
    )
}

/// Parse an advice reply into tips.
///
/// Accepts a bare JSON array or one wrapped in a fenced code block.
/// Anything else yields an empty list.
pub fn parse_tips(text: &str) -> Vec<AdviceTip> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Vec::new();
    }
    match serde_json::from_str::<Vec<AdviceTip>>(body) {
        Ok(tips) => tips,
        Err(e) => {
            tracing::warn!("advice reply is not a tip list: {e}");
            Vec::new()
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Provider used when no backend is configured. Inference always fails,
/// advice is always empty.
#[derive(Debug, Clone, Default)]
pub struct OfflineProvider {
    reason: String,
}

impl OfflineProvider {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl InferenceProvider for OfflineProvider {
    async fn infer(&self, _request: InferenceRequest) -> Result<InferenceReply, ProviderError> {
        Err(ProviderError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl AdviceProvider for OfflineProvider {
    async fn advise(&self, _tier: &str, _dataset: &str) -> Vec<AdviceTip> {
        Vec::new()
    }
}
