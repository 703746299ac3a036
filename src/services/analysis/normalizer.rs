//! Result Normalizer
//!
//! Stamps provider and model tags, default confidence and stable ids on every
//! item. Running it twice yields the same result as running it once.

use std::collections::HashSet;

use insightflow_core::AnalysisResult;
use insightflow_llm::ProviderType;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Tags applied to items that do not carry their own
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationContext {
    pub provider: String,
    pub ai_model: String,
    /// Used for insights without a usable confidence score
    pub default_confidence: f64,
}

impl NormalizationContext {
    pub fn new(
        provider: impl Into<String>,
        ai_model: impl Into<String>,
        default_confidence: f64,
    ) -> Self {
        Self {
            provider: provider.into(),
            ai_model: ai_model.into(),
            default_confidence,
        }
    }
}

/// Confidence assumed for an unscored insight from `provider`
pub fn provider_default_confidence(provider: ProviderType) -> f64 {
    match provider {
        ProviderType::Anthropic => 0.85,
        ProviderType::OpenAI => 0.8,
        ProviderType::DeepSeek | ProviderType::Glm => 0.75,
        ProviderType::Ollama => 0.7,
    }
}

/// Normalize a result.
///
/// Existing tags, ids and in-range scores are kept. Blank or duplicate
/// recommendation ids are replaced.
pub fn normalize(mut result: AnalysisResult, ctx: &NormalizationContext) -> AnalysisResult {
    let default_confidence = if ctx.default_confidence.is_finite() {
        ctx.default_confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };

    for insight in &mut result.insights {
        fill_blank(&mut insight.provider, &ctx.provider);
        fill_blank(&mut insight.ai_model, &ctx.ai_model);
        let score = match insight.confidence_score {
            Some(score) if score.is_finite() => score.clamp(0.0, 1.0),
            _ => default_confidence,
        };
        insight.confidence_score = Some(score);
    }

    let mut seen = HashSet::new();
    for rec in &mut result.recommendations {
        fill_blank(&mut rec.provider, &ctx.provider);
        fill_blank(&mut rec.ai_model, &ctx.ai_model);
        while rec.id.trim().is_empty() || !seen.insert(rec.id.clone()) {
            rec.id = synthesize_id(&rec.provider);
        }
    }

    result
}

/// `"{provider}-{timestamp_ms}-{random}"`
pub fn synthesize_id(provider: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!(
        "{}-{}-{}",
        provider,
        chrono::Utc::now().timestamp_millis(),
        suffix
    )
}

fn fill_blank(field: &mut String, value: &str) {
    if field.trim().is_empty() {
        *field = value.to_string();
    }
}
