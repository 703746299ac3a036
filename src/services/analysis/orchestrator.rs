//! Analysis Orchestrator
//!
//! Drives one adapter through the pipeline state machine:
//!
//! ```text
//! Idle -> Requesting -> Parsing -> Normalizing -> Done
//!                    \-> Failed  -/
//! ```
//!
//! A provider error or timeout moves to `Failed`, which substitutes the
//! fallback result. Every path ends in `Done` with a normalized result.

use std::sync::Arc;
use std::time::Duration;

use insightflow_core::{AnalysisRequest, AnalysisResult};
use insightflow_llm::{create_provider, LlmProvider};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::adapter::{AnalysisAdapter, ProviderAdapter};
use super::fallback::{fallback, FALLBACK_MODEL};
use super::normalizer::{normalize, NormalizationContext};
use crate::config::PipelineConfig;
use crate::utils::error::{AnalysisError, PipelineResult, ProviderError};

/// Error class reported when a reply arrived but yielded no usable lists
pub const UNPARSEABLE_REPLY: &str = "unparseable_reply";

/// States of one pipeline invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Requesting,
    Parsing,
    Failed,
    Normalizing,
    Done,
}

/// How the result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionPath {
    /// Every section came from the provider
    Parsed,
    /// Some sections were replaced with fallback content
    Degraded,
    /// Both lists came from the fallback generator
    Fallback,
}

impl CompletionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionPath::Parsed => "parsed",
            CompletionPath::Degraded => "degraded",
            CompletionPath::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for CompletionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one invocation plus how it was reached
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutcome {
    pub result: AnalysisResult,
    pub path: CompletionPath,
    /// Provider error class, or `unparseable_reply`, when the fallback path ran
    pub error_class: Option<String>,
    /// States visited, in order
    pub trace: Vec<PipelineState>,
}

/// Runs one analysis adapter with a bounded provider call.
///
/// Holds no per-request state, so one instance can be shared behind an `Arc`.
pub struct Orchestrator {
    adapter: Arc<dyn AnalysisAdapter>,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(adapter: Arc<dyn AnalysisAdapter>, timeout: Duration) -> Self {
        Self { adapter, timeout }
    }

    /// Build the provider named in `config` and wrap it in an adapter.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::with_provider(create_provider(config.provider.clone()), config)
    }

    /// Use an existing transport, e.g. one wrapped in `RetryingProvider`.
    pub fn with_provider(provider: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        Self::new(
            Arc::new(ProviderAdapter::configured(provider, config)),
            config.request_timeout(),
        )
    }

    pub fn adapter(&self) -> &Arc<dyn AnalysisAdapter> {
        &self.adapter
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Analyze a request. Never fails: provider errors yield the fallback
    /// result.
    pub async fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        self.analyze_detailed(request).await.result
    }

    /// Like `analyze`, but aborts the in-flight call when `cancel` fires.
    /// A cancelled request produces no result.
    pub async fn analyze_with_cancellation(
        &self,
        request: &AnalysisRequest,
        cancel: CancellationToken,
    ) -> PipelineResult<AnalysisResult> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(provider = self.adapter.provider_tag(), "Analysis cancelled");
                Err(AnalysisError::Cancelled)
            }
            outcome = self.analyze_detailed(request) => Ok(outcome.result),
        }
    }

    /// Analyze a request and report the path taken.
    pub async fn analyze_detailed(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        let tag = self.adapter.provider_tag().to_string();
        let mut trace = vec![PipelineState::Idle, PipelineState::Requesting];
        debug!(provider = %tag, model = self.adapter.model(), "Requesting analysis");

        let reply = match tokio::time::timeout(self.timeout, self.adapter.request_reply(request)).await
        {
            Ok(reply) => reply,
            Err(_) => {
                warn!(provider = %tag, timeout_ms = self.timeout.as_millis() as u64, "Provider call timed out");
                Err(ProviderError::timeout(tag.as_str()))
            }
        };

        let (result, model, path, error_class) = match reply {
            Ok(reply) => {
                trace.push(PipelineState::Parsing);
                let interpretation = self.adapter.interpret(&reply, request);
                let path = if interpretation.full_fallback {
                    CompletionPath::Fallback
                } else if interpretation.degraded_sections.is_empty() {
                    CompletionPath::Parsed
                } else {
                    CompletionPath::Degraded
                };
                let error_class = interpretation
                    .full_fallback
                    .then(|| UNPARSEABLE_REPLY.to_string());
                (interpretation.result, reply.model, path, error_class)
            }
            Err(err) => {
                trace.push(PipelineState::Failed);
                warn!(provider = %tag, error_class = err.class(), "Using fallback result");
                (
                    fallback(&request.dataset, &tag),
                    FALLBACK_MODEL.to_string(),
                    CompletionPath::Fallback,
                    Some(err.class().to_string()),
                )
            }
        };

        trace.push(PipelineState::Normalizing);
        let ctx = NormalizationContext::new(tag.as_str(), model, self.adapter.default_confidence());
        let result = normalize(result, &ctx);
        trace.push(PipelineState::Done);

        info!(
            provider = %tag,
            path = %path,
            insights = result.insights.len(),
            recommendations = result.recommendations.len(),
            "Analysis complete"
        );

        AnalysisOutcome {
            result,
            path,
            error_class,
            trace,
        }
    }
}
