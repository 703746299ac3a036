//! OpenAI Provider
//!
//! Implementation of the LlmProvider trait for OpenAI's chat completions API.
//! Supports GPT-4 class models and the o1/o3 reasoning family.

use async_trait::async_trait;

use super::openai_compat::{build_chat_body, get_authorized, models_url, parse_chat_response, post_json};
use super::provider::{missing_api_key_error, LlmProvider};
use super::types::{LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig};
use crate::http_client::client_for;

/// Default OpenAI API endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI provider
pub struct OpenAIProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    /// Create a new OpenAI provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = client_for(&config);
        Self { config, client }
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OPENAI_API_URL)
    }

    /// Check if model supports reasoning (o1/o3 models)
    fn model_supports_reasoning(&self) -> bool {
        let model = self.config.model.to_lowercase();
        model.starts_with("o1") || model.starts_with("o3")
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let max_tokens = request_options
            .max_tokens_override
            .unwrap_or(self.config.max_tokens);

        // Reasoning models reject temperature
        let temperature = if self.model_supports_reasoning() {
            None
        } else {
            Some(
                request_options
                    .temperature_override
                    .unwrap_or(self.config.temperature),
            )
        };

        let mut body = build_chat_body(&self.config.model, max_tokens, temperature, messages, system);

        if self.model_supports_reasoning() {
            if let Some(effort) = self.config.reasoning_effort.as_ref() {
                body["reasoning_effort"] = serde_json::json!(effort);
            }
        }

        body
    }
}

#[async_trait]
impl LlmProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn context_window(&self) -> u32 {
        let model = self.config.model.to_lowercase();
        if model.contains("o1") || model.contains("o3") || model.contains("o4") {
            200_000
        } else if model.contains("gpt-4o")
            || model.contains("gpt-4-turbo")
            || model.contains("gpt-4.1")
        {
            128_000
        } else if model.contains("gpt-4") {
            8_192
        } else if model.contains("gpt-3.5") {
            16_384
        } else {
            128_000
        }
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        let body = self.build_request_body(&messages, system.as_deref(), &request_options);

        tracing::debug!(provider = "openai", model = %self.config.model, "Sending chat completion");
        let body_text = post_json(&self.client, self.base_url(), api_key, &body, "openai").await?;

        parse_chat_response(&body_text, &self.config.model)
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("openai"))?;

        // List models to verify API key
        get_authorized(&self.client, &models_url(self.base_url()), api_key, "openai").await
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
