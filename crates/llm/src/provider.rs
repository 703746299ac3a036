//! LLM Provider Trait
//!
//! Defines the common interface for all LLM transports.

use async_trait::async_trait;

use super::types::{LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig};

/// Trait that all LLM providers must implement.
///
/// A provider is a transport: it sends one prompt and returns the reply
/// text. It knows nothing about the analysis prompt contract.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Returns the model's context window size in tokens. Default: 128,000.
    fn context_window(&self) -> u32 {
        128_000
    }

    /// Send a message and get a complete response.
    ///
    /// # Arguments
    /// * `messages` - Conversation history
    /// * `system` - Optional system prompt
    /// * `request_options` - Per-request overrides
    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;

    /// Check if the provider is healthy and reachable.
    ///
    /// For API providers, this validates the API key.
    /// For Ollama, this checks if the server is running.
    async fn health_check(&self) -> LlmResult<()>;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Seconds from a `Retry-After` header. HTTP-date values are ignored.
pub fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u32> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(
    status: u16,
    body: &str,
    provider: &str,
    retry_after: Option<u32>,
) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        408 | 504 => LlmError::Timeout {
            message: format!("{}: upstream timed out (HTTP {})", provider, status),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

/// Map a reqwest transport failure onto the provider error taxonomy.
pub fn map_transport_error(err: reqwest::Error, provider: &str) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout {
            message: format!("{}: request timed out", provider),
        }
    } else if err.is_connect() {
        LlmError::ProviderUnavailable {
            message: format!("{}: connection failed: {}", provider, err),
        }
    } else {
        LlmError::NetworkError {
            message: err.to_string(),
        }
    }
}

/// Split `<think>...</think>` reasoning out of a reply.
///
/// Returns `(thinking, text)`; either side is `None` when empty. An unclosed
/// `<think>` consumes the remainder of the reply as reasoning.
pub fn extract_thinking(content: &str) -> (Option<String>, Option<String>) {
    let mut thinking = String::new();
    let mut text = String::new();
    let mut rest = content;

    while let Some(start) = rest.find("<think>") {
        text.push_str(&rest[..start]);
        let after = &rest[start + "<think>".len()..];
        match after.find("</think>") {
            Some(end) => {
                thinking.push_str(&after[..end]);
                rest = &after[end + "</think>".len()..];
            }
            None => {
                thinking.push_str(after);
                rest = "";
            }
        }
    }
    text.push_str(rest);

    let non_empty = |s: String| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    };
    (non_empty(thinking), non_empty(text))
}
