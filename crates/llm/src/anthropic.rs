//! Anthropic Claude Provider
//!
//! Implementation of the LlmProvider trait for Anthropic's Messages API.

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{
    map_transport_error, missing_api_key_error, parse_http_error, retry_after_secs, LlmProvider,
};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageRole, ProviderConfig,
    StopReason, UsageStats,
};
use crate::http_client::client_for;

/// Default Anthropic API endpoint
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Current API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// `ProviderConfig::options` key for the extended thinking budget
const THINKING_BUDGET_OPTION: &str = "thinking_budget";

/// Anthropic Claude provider
pub struct AnthropicProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = client_for(&config);
        Self { config, client }
    }

    /// Get the API base URL
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(ANTHROPIC_API_URL)
    }

    fn thinking_budget(&self) -> Option<u64> {
        self.config
            .options
            .get(THINKING_BUDGET_OPTION)
            .and_then(|v| v.as_u64())
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": request_options
                .max_tokens_override
                .unwrap_or(self.config.max_tokens),
            "stream": false,
        });

        if let Some(sys) = system {
            body["system"] = serde_json::json!(sys);
        }

        // Extended thinking rejects a custom temperature
        let thinking_budget = self.thinking_budget().filter(|_| self.config.enable_thinking);
        match thinking_budget {
            Some(budget) => {
                body["thinking"] = serde_json::json!({
                    "type": "enabled",
                    "budget_tokens": budget
                });
            }
            None => {
                body["temperature"] = serde_json::json!(request_options
                    .temperature_override
                    .unwrap_or(self.config.temperature));
            }
        }

        // System is separate in Claude
        let claude_messages: Vec<serde_json::Value> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| {
                serde_json::json!({
                    "role": m.role.as_str(),
                    "content": m.content
                })
            })
            .collect();
        body["messages"] = serde_json::json!(claude_messages);

        body
    }

    async fn post(&self, api_key: &str, body: &serde_json::Value) -> LlmResult<String> {
        let response = self
            .client
            .post(self.base_url())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "anthropic"))?;

        let status = response.status().as_u16();
        let retry_after = retry_after_secs(response.headers());
        let body_text = response
            .text()
            .await
            .map_err(|e| map_transport_error(e, "anthropic"))?;

        if status != 200 {
            tracing::warn!(provider = "anthropic", status, "Messages request rejected");
            return Err(parse_http_error(status, &body_text, "anthropic", retry_after));
        }
        Ok(body_text)
    }

    /// Join the text blocks of a reply; thinking blocks are kept apart.
    fn parse_response(&self, response: ClaudeResponse) -> LlmResponse {
        let mut text = String::new();
        let mut thinking: Option<String> = None;

        for block in response.content {
            match block {
                ContentBlock::Text { text: part } => {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&part);
                }
                ContentBlock::Thinking { thinking: part } => {
                    thinking = Some(match thinking {
                        Some(prev) => format!("{}\n{}", prev, part),
                        None => part,
                    });
                }
                ContentBlock::Unknown => {}
            }
        }

        let stop_reason = response
            .stop_reason
            .as_deref()
            .map(StopReason::from)
            .unwrap_or(StopReason::EndTurn);

        LlmResponse {
            content: if text.is_empty() { None } else { Some(text) },
            thinking,
            stop_reason,
            usage: UsageStats {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
                thinking_tokens: None,
            },
            model: response.model.unwrap_or_else(|| self.config.model.clone()),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn context_window(&self) -> u32 {
        200_000
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
            .ok_or_else(|| missing_api_key_error("anthropic"))?;

        let body = self.build_request_body(&messages, system.as_deref(), &request_options);

        tracing::debug!(provider = "anthropic", model = %self.config.model, "Sending messages request");
        let body_text = self.post(api_key, &body).await?;

        let claude_response: ClaudeResponse =
            serde_json::from_str(&body_text).map_err(|e| LlmError::ParseError {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(self.parse_response(claude_response))
    }

    async fn health_check(&self) -> LlmResult<()> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| missing_api_key_error("anthropic"))?;

        // Make a minimal request to verify the API key
        let body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": 1,
            "messages": [{"role": "user", "content": "Hi"}]
        });
        self.post(api_key, &body).await.map(|_| ())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

/// Claude API response format
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    model: Option<String>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: ResponseUsage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}
