//! Ollama Provider
//!
//! Implementation of the LlmProvider trait for Ollama local inference
//! using the ollama-rs native SDK. No API key is required.

use async_trait::async_trait;
use ollama_rs::generation::chat::request::ChatMessageRequest;
use ollama_rs::generation::chat::{ChatMessage, ChatMessageResponse};
use ollama_rs::models::ModelOptions;
use ollama_rs::Ollama;

use super::provider::{extract_thinking, LlmProvider};
use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageRole, ProviderConfig,
    StopReason, UsageStats,
};
use crate::http_client::{client_for, TIMEOUT_OPTION};

/// Default Ollama API endpoint
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

/// Default Ollama port when the URL omits one
const OLLAMA_DEFAULT_PORT: u16 = 11434;

/// Models known to support thinking via <think> tags
const THINKING_MODELS: &[&str] = &["deepseek-r1", "qwq", "qwen3"];

/// Ollama provider for local inference using the native ollama-rs SDK
pub struct OllamaProvider {
    config: ProviderConfig,
    client: Ollama,
}

impl OllamaProvider {
    /// Create a new Ollama provider with the given configuration
    pub fn new(config: ProviderConfig) -> Self {
        let client = Self::create_client(&config);
        Self { config, client }
    }

    /// Create an Ollama SDK client from the configured base URL.
    ///
    /// `Ollama::new()` takes host and port separately. A custom reqwest
    /// client is injected when a proxy or timeout is configured.
    fn create_client(config: &ProviderConfig) -> Ollama {
        let base_url = config.base_url.as_deref().unwrap_or(OLLAMA_DEFAULT_URL);
        let Ok(parsed) = url::Url::parse(base_url) else {
            tracing::warn!(base_url, "Unparseable Ollama URL, using default endpoint");
            return Ollama::default();
        };

        let host = parsed.host_str().unwrap_or("localhost");
        let port = parsed.port().unwrap_or(OLLAMA_DEFAULT_PORT);
        let host_url = format!("{}://{}", parsed.scheme(), host);

        if config.proxy.is_some() || config.options.contains_key(TIMEOUT_OPTION) {
            Ollama::new_with_client(host_url, port, client_for(config))
        } else {
            Ollama::new(host_url, port)
        }
    }

    /// Get the base URL for the Ollama server (used in error messages)
    fn base_url(&self) -> &str {
        self.config.base_url.as_deref().unwrap_or(OLLAMA_DEFAULT_URL)
    }

    /// Check if model supports thinking
    fn model_supports_thinking(&self) -> bool {
        let model_lower = self.config.model.to_lowercase();
        THINKING_MODELS.iter().any(|known| model_lower.contains(known))
            || model_lower.contains("r1")
    }

    /// Build a ChatMessageRequest from our unified types
    fn build_chat_request(
        &self,
        messages: &[Message],
        system: Option<&str>,
        request_options: &LlmRequestOptions,
    ) -> ChatMessageRequest {
        let mut chat_messages: Vec<ChatMessage> = Vec::with_capacity(messages.len() + 1);

        if let Some(sys) = system {
            chat_messages.push(ChatMessage::system(sys.to_string()));
        }

        for msg in messages {
            chat_messages.push(match msg.role {
                MessageRole::System => ChatMessage::system(msg.content.clone()),
                MessageRole::User => ChatMessage::user(msg.content.clone()),
                MessageRole::Assistant => ChatMessage::assistant(msg.content.clone()),
            });
        }

        let mut request = ChatMessageRequest::new(self.config.model.clone(), chat_messages);

        let temperature = request_options
            .temperature_override
            .unwrap_or(self.config.temperature);
        let max_tokens = request_options
            .max_tokens_override
            .unwrap_or(self.config.max_tokens);
        let mut opts = ModelOptions::default().temperature(temperature);
        if max_tokens > 0 {
            opts = opts.num_predict(max_tokens as i32);
        }
        request.options(opts)
    }

    fn convert_response(&self, response: &ChatMessageResponse) -> LlmResponse {
        let (thinking, content) = if self.model_supports_thinking() {
            extract_thinking(&response.message.content)
        } else {
            let text = response.message.content.trim();
            (None, (!text.is_empty()).then(|| text.to_string()))
        };

        let usage = match &response.final_data {
            Some(final_data) => UsageStats {
                input_tokens: final_data.prompt_eval_count as u32,
                output_tokens: final_data.eval_count as u32,
                thinking_tokens: None,
            },
            None => UsageStats::default(),
        };

        LlmResponse {
            content,
            thinking,
            stop_reason: StopReason::EndTurn,
            usage,
            model: if response.model.is_empty() {
                self.config.model.clone()
            } else {
                response.model.clone()
            },
        }
    }

    /// Classify an SDK error by its message; ollama-rs does not expose the
    /// underlying transport error kind.
    fn map_sdk_error(&self, msg: String) -> LlmError {
        let lower = msg.to_lowercase();
        if lower.contains("timed out") || lower.contains("timeout") {
            LlmError::Timeout {
                message: format!("ollama: request timed out at {}", self.base_url()),
            }
        } else if lower.contains("connect") || lower.contains("connection refused") {
            LlmError::ProviderUnavailable {
                message: format!("Cannot connect to Ollama at {}", self.base_url()),
            }
        } else if lower.contains("not found") || lower.contains("404") {
            LlmError::ModelNotFound {
                model: self.config.model.clone(),
            }
        } else {
            LlmError::NetworkError { message: msg }
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn context_window(&self) -> u32 {
        // Local models vary widely; stay conservative
        8_192
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let request = self.build_chat_request(&messages, system.as_deref(), &request_options);

        tracing::debug!(provider = "ollama", model = %self.config.model, "Sending chat request");
        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| self.map_sdk_error(e.to_string()))?;

        Ok(self.convert_response(&response))
    }

    async fn health_check(&self) -> LlmResult<()> {
        // Use the SDK's list_local_models as a health check
        self.client
            .list_local_models()
            .await
            .map_err(|e| self.map_sdk_error(e.to_string()))?;
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderType;

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            provider: ProviderType::Ollama,
            api_key: None,
            model: "llama3.2".to_string(),
            base_url: Some("http://localhost:11434".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_provider_creation() {
        let provider = OllamaProvider::new(test_config());
        assert_eq!(provider.name(), "ollama");
        assert_eq!(provider.model(), "llama3.2");
        assert_eq!(provider.context_window(), 8_192);
        assert!(!provider.model_supports_thinking());
    }

    #[test]
    fn test_thinking_model() {
        let provider = OllamaProvider::new(ProviderConfig {
            model: "deepseek-r1:14b".to_string(),
            ..test_config()
        });
        assert!(provider.model_supports_thinking());
    }

    #[test]
    fn test_base_url() {
        let provider = OllamaProvider::new(ProviderConfig {
            base_url: None,
            ..test_config()
        });
        assert_eq!(provider.base_url(), OLLAMA_DEFAULT_URL);

        let custom = OllamaProvider::new(ProviderConfig {
            base_url: Some("http://gpu-box:8080".to_string()),
            ..test_config()
        });
        assert_eq!(custom.base_url(), "http://gpu-box:8080");
    }

    #[test]
    fn test_invalid_base_url_does_not_panic() {
        let provider = OllamaProvider::new(ProviderConfig {
            base_url: Some("not a url".to_string()),
            ..test_config()
        });
        assert_eq!(provider.name(), "ollama");
    }

    #[test]
    fn test_sdk_error_mapping() {
        let provider = OllamaProvider::new(test_config());
        assert!(matches!(
            provider.map_sdk_error("error sending request: Connection refused".to_string()),
            LlmError::ProviderUnavailable { .. }
        ));
        assert!(matches!(
            provider.map_sdk_error("model 'llama9' not found".to_string()),
            LlmError::ModelNotFound { .. }
        ));
        assert!(matches!(
            provider.map_sdk_error("operation timed out".to_string()),
            LlmError::Timeout { .. }
        ));
    }
}
