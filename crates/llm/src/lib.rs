//! InsightFlow LLM
//!
//! Provides a unified transport interface over multiple LLM providers:
//! - Anthropic Claude
//! - OpenAI (GPT-4, o1, o3)
//! - DeepSeek
//! - GLM (ZhipuAI)
//! - Ollama (local inference)
//!
//! Also includes the HTTP client factory, the provider factory and a
//! retrying decorator.

pub mod anthropic;
pub mod deepseek;
pub mod factory;
pub mod glm;
pub mod http_client;
pub mod ollama;
pub mod openai;
mod openai_compat;
pub mod provider;
pub mod retry;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use deepseek::DeepSeekProvider;
pub use factory::create_provider;
pub use glm::GlmProvider;
pub use http_client::{build_http_client, ProxyConfig};
pub use ollama::OllamaProvider;
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
pub use retry::{RetryConfig, RetryingProvider};
pub use types::*;
