//! Provider Adapter
//!
//! One generic adapter drives any `LlmProvider` transport: it renders the
//! provider's prompt template, makes exactly one call, and turns the raw reply
//! into an `AnalysisResult`, replacing only the sections that failed.

use std::sync::Arc;

use async_trait::async_trait;
use insightflow_core::{AnalysisRequest, AnalysisResult, Insight, Recommendation};
use insightflow_llm::{LlmProvider, LlmRequestOptions, Message};
use tracing::{debug, info, warn};

use super::context::ContextBuilder;
use super::extractor::{
    extract, parse_insights, parse_recommendations, parse_summary, Section, SectionError,
};
use super::fallback::{fallback, fallback_insights, fallback_recommendations, fallback_summary};
use super::normalizer::{normalize, provider_default_confidence, NormalizationContext};
use super::prompts::PromptTemplate;
use crate::config::{FallbackPolicy, PipelineConfig};
use crate::utils::error::ProviderError;

/// Text of one provider call together with the model that produced it.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderReply {
    pub text: String,
    pub model: String,
}

impl std::fmt::Debug for ProviderReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderReply")
            .field("text_len", &self.text.len())
            .field("model", &self.model)
            .finish()
    }
}

/// Result of interpreting a reply, before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub result: AnalysisResult,
    /// Sections replaced by fallback content
    pub degraded_sections: Vec<Section>,
    /// Both lists came from the fallback generator
    pub full_fallback: bool,
}

/// A provider-specific analysis adapter.
///
/// `analyze` is the whole adapter contract. The orchestrator calls the two
/// halves separately so it can bound the network call and observe each
/// state transition.
#[async_trait]
pub trait AnalysisAdapter: Send + Sync {
    /// Provider tag stamped on every item
    fn provider_tag(&self) -> &str;

    /// Configured model, used when a reply does not name one
    fn model(&self) -> &str;

    /// Confidence assumed for unscored insights
    fn default_confidence(&self) -> f64;

    /// Make the single provider call for `request`.
    async fn request_reply(&self, request: &AnalysisRequest) -> Result<ProviderReply, ProviderError>;

    /// Parse a reply into a result. Never fails; failed sections are
    /// replaced with fallback content.
    fn interpret(&self, reply: &ProviderReply, request: &AnalysisRequest) -> Interpretation;

    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, ProviderError> {
        let reply = self.request_reply(request).await?;
        let interpretation = self.interpret(&reply, request);
        let ctx = NormalizationContext::new(
            self.provider_tag(),
            reply.model.as_str(),
            self.default_confidence(),
        );
        Ok(normalize(interpretation.result, &ctx))
    }
}

/// Adapter over an `LlmProvider` transport
pub struct ProviderAdapter {
    provider: Arc<dyn LlmProvider>,
    template: PromptTemplate,
    context_builder: ContextBuilder,
    fallback_policy: FallbackPolicy,
    default_confidence: f64,
}

impl ProviderAdapter {
    /// Adapter with the provider's own template and default confidence.
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let provider_type = provider.config().provider;
        Self {
            template: PromptTemplate::for_provider(provider_type),
            context_builder: ContextBuilder::default(),
            fallback_policy: FallbackPolicy::default(),
            default_confidence: provider_default_confidence(provider_type),
            provider,
        }
    }

    /// Adapter configured from a pipeline config
    pub fn configured(provider: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        let mut adapter = Self::new(provider)
            .with_context_builder(ContextBuilder::new(config.max_sample_rows))
            .with_fallback_policy(config.fallback_policy);
        if let Some(confidence) = config.default_confidence {
            adapter = adapter.with_default_confidence(confidence);
        }
        adapter
    }

    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_context_builder(mut self, context_builder: ContextBuilder) -> Self {
        self.context_builder = context_builder;
        self
    }

    pub fn with_fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.fallback_policy = policy;
        self
    }

    pub fn with_default_confidence(mut self, confidence: f64) -> Self {
        self.default_confidence = confidence;
        self
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.fallback_policy
    }

    fn log_section_failure(&self, section: Section, err: &SectionError) {
        warn!(
            provider = self.provider_tag(),
            section = section.as_str(),
            error_class = err.class(),
            "Section could not be parsed; substituting fallback content"
        );
    }
}

#[async_trait]
impl AnalysisAdapter for ProviderAdapter {
    fn provider_tag(&self) -> &str {
        self.provider.name()
    }

    fn model(&self) -> &str {
        self.provider.model()
    }

    fn default_confidence(&self) -> f64 {
        self.default_confidence
    }

    async fn request_reply(&self, request: &AnalysisRequest) -> Result<ProviderReply, ProviderError> {
        let tag = self.provider_tag();
        let context = self.context_builder.build(request);
        let system = self.template.system_prompt(&request.user_context);
        let prompt = self.template.user_prompt(&context, &request.user_context);

        debug!(
            provider = tag,
            model = self.model(),
            context_len = context.len(),
            "Sending analysis request"
        );

        let response = self
            .provider
            .send_message(
                vec![Message::user(prompt)],
                Some(system),
                LlmRequestOptions::default(),
            )
            .await
            .map_err(|e| {
                let err = ProviderError::from_llm(tag, &e);
                warn!(provider = tag, error_class = err.class(), "Provider call failed");
                err
            })?;

        if response.is_truncated() {
            warn!(provider = tag, "Provider reply hit the token limit and may be incomplete");
        }

        let model = if response.model.trim().is_empty() {
            self.model().to_string()
        } else {
            response.model
        };
        let text = response.content.unwrap_or_default();
        info!(provider = tag, model = %model, reply_len = text.len(), "Received provider reply");

        Ok(ProviderReply { text, model })
    }

    fn interpret(&self, reply: &ProviderReply, request: &AnalysisRequest) -> Interpretation {
        let tag = self.provider_tag();
        let dataset = &request.dataset;
        let sections = extract(&reply.text);

        let summary = sections.summary.as_deref().and_then(parse_summary);
        let insights = sections
            .insights_json
            .as_deref()
            .ok_or(SectionError::Missing)
            .and_then(parse_insights);
        let recommendations = sections
            .recommendations_json
            .as_deref()
            .ok_or(SectionError::Missing)
            .and_then(parse_recommendations);

        let mut degraded_sections = Vec::new();
        if summary.is_none() {
            degraded_sections.push(Section::Summary);
        }

        let full_fallback = match self.fallback_policy {
            FallbackPolicy::FieldLevel => insights.is_err() && recommendations.is_err(),
            FallbackPolicy::Strict => insights.is_err() || recommendations.is_err(),
        };

        if full_fallback {
            if let Err(e) = &insights {
                self.log_section_failure(Section::Insights, e);
            }
            if let Err(e) = &recommendations {
                self.log_section_failure(Section::Recommendations, e);
            }
            warn!(
                provider = tag,
                reply_len = reply.text.len(),
                "Reply unusable; substituting full fallback"
            );
            degraded_sections.extend([Section::Insights, Section::Recommendations]);

            let mut result = fallback(dataset, tag);
            if let Some(summary) = summary {
                result.summary = summary;
            }
            return Interpretation {
                result,
                degraded_sections,
                full_fallback: true,
            };
        }

        let insights = match insights {
            Ok(items) => tag_insights(items, tag, &reply.model),
            Err(e) => {
                self.log_section_failure(Section::Insights, &e);
                degraded_sections.push(Section::Insights);
                fallback_insights(dataset, tag)
            }
        };
        let recommendations = match recommendations {
            Ok(items) => tag_recommendations(items, tag, &reply.model),
            Err(e) => {
                self.log_section_failure(Section::Recommendations, &e);
                degraded_sections.push(Section::Recommendations);
                fallback_recommendations(tag)
            }
        };

        Interpretation {
            result: AnalysisResult {
                summary: summary.unwrap_or_else(|| fallback_summary(dataset)),
                insights,
                recommendations,
            },
            degraded_sections,
            full_fallback: false,
        }
    }
}

fn tag_insights(mut items: Vec<Insight>, provider: &str, model: &str) -> Vec<Insight> {
    for item in &mut items {
        item.provider = provider.to_string();
        item.ai_model = model.to_string();
    }
    items
}

fn tag_recommendations(
    mut items: Vec<Recommendation>,
    provider: &str,
    model: &str,
) -> Vec<Recommendation> {
    for item in &mut items {
        item.provider = provider.to_string();
        item.ai_model = model.to_string();
    }
    items
}
