//! OpenAI-Compatible Chat Completions
//!
//! Request body construction and response parsing shared by providers that
//! speak the `/chat/completions` dialect (OpenAI, DeepSeek, GLM).

use serde::Deserialize;

use super::provider::{map_transport_error, parse_http_error, retry_after_secs};
use super::types::{LlmError, LlmResponse, LlmResult, Message, StopReason, UsageStats};

/// Build the `messages` array, placing `system` first.
pub(crate) fn build_messages(messages: &[Message], system: Option<&str>) -> Vec<serde_json::Value> {
    let mut api_messages: Vec<serde_json::Value> = Vec::with_capacity(messages.len() + 1);

    if let Some(sys) = system {
        api_messages.push(serde_json::json!({
            "role": "system",
            "content": sys
        }));
    }

    for msg in messages {
        api_messages.push(serde_json::json!({
            "role": msg.role.as_str(),
            "content": msg.content
        }));
    }

    api_messages
}

/// Build a non-streaming chat completion body.
pub(crate) fn build_chat_body(
    model: &str,
    max_tokens: u32,
    temperature: Option<f32>,
    messages: &[Message],
    system: Option<&str>,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "max_tokens": max_tokens,
        "stream": false,
        "messages": build_messages(messages, system),
    });
    if let Some(t) = temperature {
        body["temperature"] = serde_json::json!(t);
    }
    body
}

/// POST a JSON body with bearer auth and return the raw success body.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &serde_json::Value,
    provider: &str,
) -> LlmResult<String> {
    let response = client
        .post(url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| map_transport_error(e, provider))?;

    let status = response.status().as_u16();
    let retry_after = retry_after_secs(response.headers());
    let body_text = response
        .text()
        .await
        .map_err(|e| map_transport_error(e, provider))?;

    if status != 200 {
        tracing::warn!(provider, status, "Chat completion request rejected");
        return Err(parse_http_error(status, &body_text, provider, retry_after));
    }
    Ok(body_text)
}

/// GET with bearer auth, used by health checks.
pub(crate) async fn get_authorized(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    provider: &str,
) -> LlmResult<()> {
    let response = client
        .get(url)
        .header("Authorization", format!("Bearer {}", api_key))
        .send()
        .await
        .map_err(|e| map_transport_error(e, provider))?;

    let status = response.status().as_u16();
    if status == 200 {
        Ok(())
    } else {
        let retry_after = retry_after_secs(response.headers());
        let body = response.text().await.unwrap_or_default();
        Err(parse_http_error(status, &body, provider, retry_after))
    }
}

/// Derive the `/models` listing URL from a chat completions URL.
pub(crate) fn models_url(chat_url: &str) -> String {
    match chat_url.strip_suffix("/chat/completions") {
        Some(base) => format!("{}/models", base),
        None => format!("{}/models", chat_url.trim_end_matches('/')),
    }
}

/// Chat completions response format
#[derive(Debug, Deserialize)]
pub(crate) struct ChatCompletionResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    pub usage: Option<ResponseUsage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: Option<ResponseMessage>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionTokensDetails {
    #[serde(default)]
    pub reasoning_tokens: Option<u32>,
}

/// Parse a response body into the unified response.
pub(crate) fn parse_chat_response(body_text: &str, fallback_model: &str) -> LlmResult<LlmResponse> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body_text).map_err(|e| LlmError::ParseError {
            message: format!("Failed to parse response: {}", e),
        })?;

    let choice = response.choices.first();
    let (content, thinking) = choice
        .and_then(|c| c.message.as_ref())
        .map(|m| (m.content.clone(), m.reasoning_content.clone()))
        .unwrap_or((None, None));

    let stop_reason = choice
        .and_then(|c| c.finish_reason.as_ref())
        .map(|r| StopReason::from(r.as_str()))
        .unwrap_or(StopReason::EndTurn);

    let usage = response
        .usage
        .as_ref()
        .map(|u| UsageStats {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            thinking_tokens: u
                .completion_tokens_details
                .as_ref()
                .and_then(|d| d.reasoning_tokens),
        })
        .unwrap_or_default();

    let model = if response.model.is_empty() {
        fallback_model.to_string()
    } else {
        response.model
    };

    Ok(LlmResponse {
        content: content.filter(|c| !c.is_empty()),
        thinking,
        stop_reason,
        usage,
        model,
    })
}
