//! Provider Factory

use std::sync::Arc;

use crate::anthropic::AnthropicProvider;
use crate::deepseek::DeepSeekProvider;
use crate::glm::GlmProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAIProvider;
use crate::provider::LlmProvider;
use crate::types::{ProviderConfig, ProviderType};

/// Create an LLM provider from a ProviderConfig.
///
/// Maps ProviderType to the concrete transport implementation.
pub fn create_provider(config: ProviderConfig) -> Arc<dyn LlmProvider> {
    tracing::debug!(provider = %config.provider, model = %config.model, "Creating LLM provider");
    match config.provider {
        ProviderType::Anthropic => Arc::new(AnthropicProvider::new(config)),
        ProviderType::OpenAI => Arc::new(OpenAIProvider::new(config)),
        ProviderType::DeepSeek => Arc::new(DeepSeekProvider::new(config)),
        ProviderType::Glm => Arc::new(GlmProvider::new(config)),
        ProviderType::Ollama => Arc::new(OllamaProvider::new(config)),
    }
}
