//! DeepSeek Provider
//!
//! Implementation of the LlmProvider trait for DeepSeek's API.
//! Supports deepseek-chat and the R1 reasoner, whose reasoning arrives either
//! in `reasoning_content` or inline inside `<think>` tags.

use async_trait::async_trait;

use super::openai_compat::{build_chat_body, parse_chat_response, post_json};
use super::provider::{extract_thinking, missing_api_key_error, LlmProvider};
use super::types::{LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig};
use crate::http_client::client_for;

/// Default DeepSeek API endpoint
const DEEPSEEK_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";

/// DeepSeek provider
pub struct DeepSeekProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl DeepSeekProvider {
    /// Create a new DeepSeek provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = client_for(&config);
        Self { config, client }
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(DEEPSEEK_API_URL)
    }

    /// Check if model supports thinking (R1 models)
    fn model_supports_thinking(&self) -> bool {
        let model = self.config.model.to_lowercase();
        model.contains("r1") || model.contains("reasoner")
    }

    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        build_chat_body(
            &self.config.model,
            request_options
                .max_tokens_override
                .unwrap_or(self.config.max_tokens),
            Some(
                request_options
                    .temperature_override
                    .unwrap_or(self.config.temperature),
            ),
            messages,
            system,
        )
    }

    /// Move inline `<think>` blocks out of the reply text.
    fn split_inline_thinking(&self, mut response: LlmResponse) -> LlmResponse {
        if let Some(raw) = response.content.take() {
            let (think, text) = extract_thinking(&raw);
            response.content = text;
            if response.thinking.is_none() {
                response.thinking = think;
            }
        }
        response
    }
}

#[async_trait]
impl LlmProvider for DeepSeekProvider {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn context_window(&self) -> u32 {
        let model = self.config.model.to_lowercase();
        if model.contains("v2.5") {
            128_000
        } else {
            64_000
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
            .ok_or_else(|| missing_api_key_error("deepseek"))?;

        let body = self.build_request_body(&messages, system.as_deref(), &request_options);

        tracing::debug!(
            provider = "deepseek",
            model = %self.config.model,
            reasoning = self.model_supports_thinking(),
            "Sending chat completion"
        );
        let body_text = post_json(&self.client, self.base_url(), api_key, &body, "deepseek").await?;
        let response = parse_chat_response(&body_text, &self.config.model)?;

        Ok(self.split_inline_thinking(response))
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("deepseek"))?;

        // Make a minimal request to verify the API key
        let body = build_chat_body(&self.config.model, 1, None, &[Message::user("Hi")], None);
        post_json(&self.client, self.base_url(), api_key, &body, "deepseek")
            .await
            .map(|_| ())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
