//! Anthropic Messages API provider.
//!
//! `AnthropicClient` is the raw HTTP layer (reqwest, no console awareness).
//! `AnthropicProvider` wraps it with a backend model and token budget and
//! implements both provider traits.

use async_trait::async_trait;
use reqwest::Client;

use super::types::{resolve_model, Message, MessagesRequest, MessagesResponse};
use super::{
    advice_prompt, parse_tips, AdviceProvider, AdviceTip, InferenceProvider, InferenceReply,
    InferenceRequest, ProviderError,
};
use crate::config::ProviderSettings;

/// Raw HTTP client for the Anthropic Messages API.
#[derive(Debug)]
pub struct AnthropicClient {
    http: Client,
    api_key: String,
    base_url: String,
    api_version: String,
}

impl AnthropicClient {
    /// Create a client with default base URL (https://api.anthropic.com).
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, "https://api.anthropic.com".into())
    }

    /// Create a client with a custom base URL (proxies, mock servers).
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: "2023-06-01".into(),
        }
    }

    /// Send a messages request.
    pub async fn messages(
        &self,
        request: &MessagesRequest,
    ) -> Result<MessagesResponse, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", &self.api_version)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status >= 400 {
            let body = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(ProviderError::ApiError {
                status,
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("failed to parse response: {e}")))
    }
}

/// Inference and advice over the Anthropic Messages API.
#[derive(Debug)]
pub struct AnthropicProvider {
    client: AnthropicClient,
    model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(client: AnthropicClient, model: &str, max_tokens: u32) -> Self {
        Self {
            client,
            model: resolve_model(model).to_string(),
            max_tokens,
        }
    }

    /// Build from provider settings. Fails when no API key is available.
    pub fn from_settings(settings: &ProviderSettings) -> Result<Self, ProviderError> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            ProviderError::MissingApiKey(
                "set provider.api_key in the config file or ANTHROPIC_API_KEY".into(),
            )
        })?;
        let client = match &settings.base_url {
            Some(base_url) => AnthropicClient::with_base_url(api_key, base_url.clone()),
            None => AnthropicClient::new(api_key),
        };
        Ok(Self::new(client, &settings.model, settings.max_tokens))
    }

    /// Backend model ID requests are sent to.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, prompt: &str, system: Option<String>) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: vec![Message::user(prompt)],
            system,
        }
    }
}

#[async_trait]
impl InferenceProvider for AnthropicProvider {
    async fn infer(&self, request: InferenceRequest) -> Result<InferenceReply, ProviderError> {
        tracing::debug!(model_id = %request.model_id, backend = %self.model, "inference request");
        let body = self.build_request(&request.prompt, request.instruction);
        let response = self.client.messages(&body).await?;
        tracing::debug!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "inference reply"
        );
        Ok(InferenceReply {
            text: response.text(),
        })
    }
}

#[async_trait]
impl AdviceProvider for AnthropicProvider {
    async fn advise(&self, tier: &str, dataset: &str) -> Vec<AdviceTip> {
        let body = self.build_request(&advice_prompt(tier, dataset), None);
        match self.client.messages(&body).await {
            Ok(response) => parse_tips(&response.text()),
            Err(e) => {
                tracing::warn!("advice request failed: {e}");
                Vec::new()
            }
        }
    }
}
