//! GLM (ZhipuAI) Provider
//!
//! Implementation of the LlmProvider trait for ZhipuAI's GLM API.
//! Responses are decoded with the zai-rs SDK types; transport is plain
//! reqwest so any model name can be used at runtime.

use async_trait::async_trait;
use zai_rs::model::chat_base_response::{ChatCompletionResponse as ZaiResponse, Usage as ZaiUsage};

use super::openai_compat::{build_chat_body, post_json};
use super::provider::{extract_thinking, missing_api_key_error, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig, StopReason,
    UsageStats,
};
use crate::http_client::client_for;

/// Default GLM API endpoint
const GLM_API_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";

/// GLM provider backed by zai-rs SDK types for deserialization.
///
/// The SDK's own `ChatCompletion` requires compile-time model type
/// parameters, so requests are built by hand.
pub struct GlmProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GlmProvider {
    /// Create a new GLM provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = client_for(&config);
        Self { config, client }
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(GLM_API_URL)
    }

    /// Check if model supports reasoning (GLM-4.5+ and the thinking variants)
    fn model_supports_reasoning(&self) -> bool {
        let model = self.config.model.to_lowercase();
        model.contains("4.5")
            || model.contains("4.6")
            || model.contains("4.7")
            || model.contains("thinking")
    }

    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let mut body = build_chat_body(
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
        );

        if self.model_supports_reasoning() {
            let mode = if self.config.enable_thinking {
                "enabled"
            } else {
                "disabled"
            };
            body["thinking"] = serde_json::json!({ "type": mode });
        }

        body
    }

    /// Parse a non-streaming response using zai-rs ChatCompletionResponse type.
    fn parse_zai_response(&self, response: &ZaiResponse) -> LlmResponse {
        let choices = response.choices().unwrap_or(&[]);
        let choice = choices.first();
        let mut content = None;
        let mut thinking = None;

        if let Some(choice) = choice {
            let msg = &choice.message;
            // zai-rs stores content as Option<serde_json::Value>
            if let Some(c) = msg.content() {
                match c {
                    serde_json::Value::String(s) => {
                        if !s.is_empty() {
                            content = Some(s.clone());
                        }
                    }
                    serde_json::Value::Null => {}
                    other => content = Some(other.to_string()),
                }
            }
            thinking = msg.reasoning_content().map(|s| s.to_string());
        }

        // Older GLM models inline their reasoning
        if let Some(raw) = content.take() {
            let (think, text) = extract_thinking(&raw);
            content = text;
            if thinking.is_none() {
                thinking = think;
            }
        }

        let stop_reason = choice
            .and_then(|c| c.finish_reason.as_ref())
            .map(|r| StopReason::from(r.as_str()))
            .unwrap_or(StopReason::EndTurn);

        LlmResponse {
            content,
            thinking,
            stop_reason,
            usage: Self::convert_zai_usage(response.usage()),
            model: response.model().unwrap_or(&self.config.model).to_string(),
        }
    }

    /// Convert zai-rs Usage to our UsageStats.
    fn convert_zai_usage(usage: Option<&ZaiUsage>) -> UsageStats {
        usage
            .map(|u| UsageStats {
                input_tokens: u.prompt_tokens().unwrap_or(0),
                output_tokens: u.completion_tokens().unwrap_or(0),
                thinking_tokens: None,
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for GlmProvider {
    fn name(&self) -> &'static str {
        "glm"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn context_window(&self) -> u32 {
        let model = self.config.model.to_lowercase();
        // "4.5v" contains "4.5", so vision models are checked first
        if model.contains("4.5v") {
            16_384
        } else if model.contains("4v") {
            8_192
        } else if model.contains("4.6v") || model.contains("4.1v") {
            32_768
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
            .ok_or_else(|| missing_api_key_error("glm"))?;

        let body = self.build_request_body(&messages, system.as_deref(), &request_options);

        tracing::debug!(provider = "glm", model = %self.config.model, "Sending chat completion");
        let body_text = post_json(&self.client, self.base_url(), api_key, &body, "glm").await?;

        let zai_response: ZaiResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(self.parse_zai_response(&zai_response))
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("glm"))?;

        let body = build_chat_body(&self.config.model, 1, None, &[Message::user("Hi")], None);
        post_json(&self.client, self.base_url(), api_key, &body, "glm")
            .await
            .map(|_| ())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
