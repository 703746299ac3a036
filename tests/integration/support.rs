//! Scripted LLM transport

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use insightflow::{AnalysisRequest, DatasetSummary, UserContext};
use insightflow_llm::{
    LlmError, LlmProvider, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig,
    ProviderType,
};

/// Replays queued replies; the last one repeats once the queue is drained.
pub struct ScriptedProvider {
    config: ProviderConfig,
    name: &'static str,
    replies: Mutex<VecDeque<LlmResult<LlmResponse>>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(provider: ProviderType, replies: Vec<LlmResult<LlmResponse>>) -> Self {
        let name = match provider {
            ProviderType::Anthropic => "anthropic",
            ProviderType::OpenAI => "openai",
            ProviderType::DeepSeek => "deepseek",
            ProviderType::Glm => "glm",
            ProviderType::Ollama => "ollama",
        };
        let config = ProviderConfig::for_provider(provider);
        Self {
            name,
            config,
            replies: Mutex::new(replies.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always answers with `text`
    pub fn replying(provider: ProviderType, text: &str) -> Self {
        let model = provider.default_model();
        Self::new(provider, vec![Ok(LlmResponse::text(text, model))])
    }

    /// Always fails with `error`
    pub fn failing(provider: ProviderType, error: LlmError) -> Self {
        Self::new(provider, vec![Err(error)])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn send_message(
        &self,
        _messages: Vec<Message>,
        _system: Option<String>,
        _request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut replies = self.replies.lock().unwrap();
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap()
        }
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

pub fn sales_request() -> AnalysisRequest {
    AnalysisRequest::new(
        "q3-sales.csv",
        DatasetSummary::with_shape(250, 6),
        UserContext {
            industry: Some("retail".to_string()),
            role: Some("marketing_manager".to_string()),
            plan_type: Some("pro".to_string()),
        },
    )
}

pub const WELL_FORMED_REPLY: &str = "SUMMARY: ok\nINSIGHTS: [{\"type\":\"trend\",\"title\":\"T\",\"content\":\"C\",\"confidence_score\":0.9}]\nRECOMMENDATIONS: [{\"title\":\"R\",\"description\":\"D\",\"impact\":\"High\",\"effort\":\"Low\",\"category\":\"x\"}]";
