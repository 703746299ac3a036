//! Reply Scenario Integration Tests
//!
//! Raw provider text in, normalized result out, through the full
//! orchestrator with a scripted transport.

use std::time::Duration;

use insightflow::services::analysis::{build_analysis_context, fallback, FALLBACK_MODEL};
use insightflow::{
    AnalysisRequest, CompletionPath, DatasetSummary, InsightType, Level, Orchestrator,
    PipelineConfig, UserContext,
};
use insightflow_llm::{LlmError, LlmProvider, ProviderType};

use super::support::{sales_request, ScriptedProvider, WELL_FORMED_REPLY};

fn orchestrator_for(provider: ScriptedProvider) -> Orchestrator {
    let config = PipelineConfig::for_provider(provider.config().provider);
    Orchestrator::with_provider(provider.into_arc(), &config)
}

// ============================================================================
// Well-formed reply
// ============================================================================

#[tokio::test]
async fn test_well_formed_reply_is_parsed() {
    let orchestrator =
        orchestrator_for(ScriptedProvider::replying(ProviderType::OpenAI, WELL_FORMED_REPLY));
    let outcome = orchestrator.analyze_detailed(&sales_request()).await;

    assert_eq!(outcome.path, CompletionPath::Parsed);
    assert!(outcome.error_class.is_none());

    let result = outcome.result;
    assert_eq!(result.summary, "ok");
    assert_eq!(result.insights.len(), 1);
    assert_eq!(result.insights[0].insight_type, InsightType::Trend);
    assert_eq!(result.insights[0].confidence_score, Some(0.9));
    assert_eq!(result.insights[0].provider, "openai");
    assert_eq!(result.insights[0].ai_model, "gpt-4o");

    assert_eq!(result.recommendations.len(), 1);
    let rec = &result.recommendations[0];
    assert_eq!(rec.title, "R");
    assert_eq!(rec.impact, Level::High);
    assert_eq!(rec.effort, Level::Low);
    assert_eq!(rec.category, "x");
    assert!(rec.id.starts_with("openai-"));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["insights"][0]["confidenceScore"], 0.9);
}

// ============================================================================
// Missing section
// ============================================================================

#[tokio::test]
async fn test_missing_recommendations_use_fallback_defaults() {
    let reply = "SUMMARY: ok\nINSIGHTS: [{\"type\":\"trend\",\"title\":\"T\",\"content\":\"C\",\"confidence_score\":0.9}]";
    let request = sales_request();
    let orchestrator = orchestrator_for(ScriptedProvider::replying(ProviderType::Anthropic, reply));
    let outcome = orchestrator.analyze_detailed(&request).await;

    assert_eq!(outcome.path, CompletionPath::Degraded);
    let result = outcome.result;
    assert_eq!(result.summary, "ok");
    assert_eq!(result.insights.len(), 1);
    assert_eq!(result.insights[0].title, "T");
    assert!(!result.insights[0].is_fallback());
    assert_eq!(
        result.recommendations,
        fallback(&request.dataset, "anthropic").recommendations
    );
}

// ============================================================================
// Provider failure
// ============================================================================

#[tokio::test]
async fn test_transport_timeout_yields_exact_fallback() {
    let request = sales_request();
    let orchestrator = orchestrator_for(ScriptedProvider::failing(
        ProviderType::DeepSeek,
        LlmError::Timeout {
            message: "request timed out after 60s".to_string(),
        },
    ));
    let outcome = orchestrator.analyze_detailed(&request).await;

    assert_eq!(outcome.path, CompletionPath::Fallback);
    assert_eq!(outcome.error_class.as_deref(), Some("timeout"));
    assert_eq!(outcome.result, fallback(&request.dataset, "deepseek"));
    assert!(outcome
        .result
        .insights
        .iter()
        .all(|i| i.provider == "deepseek" && i.ai_model == FALLBACK_MODEL));
}

#[tokio::test(start_paused = true)]
async fn test_slow_provider_is_cut_off_by_orchestrator_timeout() {
    let request = sales_request();
    let provider = ScriptedProvider::replying(ProviderType::Glm, WELL_FORMED_REPLY)
        .with_delay(Duration::from_secs(600));
    let mut config = PipelineConfig::for_provider(ProviderType::Glm);
    config.request_timeout_secs = 30;
    let orchestrator = Orchestrator::with_provider(provider.into_arc(), &config);

    let outcome = orchestrator.analyze_detailed(&request).await;
    assert_eq!(outcome.error_class.as_deref(), Some("timeout"));
    assert_eq!(outcome.result, fallback(&request.dataset, "glm"));
}

// ============================================================================
// Empty dataset
// ============================================================================

#[tokio::test]
async fn test_empty_dataset_still_produces_result() {
    let request = AnalysisRequest::new(
        "empty.csv",
        DatasetSummary::with_shape(0, 0),
        UserContext::default(),
    );
    let context = build_analysis_context(&request);
    assert!(context.contains("- Rows: N/A"));
    assert!(context.contains("- Columns: N/A"));

    let orchestrator = orchestrator_for(ScriptedProvider::replying(
        ProviderType::Ollama,
        "SUMMARY: The file is empty.",
    ));
    let result = orchestrator.analyze(&request).await;

    assert_eq!(result.summary, "The file is empty.");
    assert!(!result.insights.is_empty());
    assert!(!result.recommendations.is_empty());
    assert!(result.recommendations.iter().all(|r| !r.id.is_empty()));
    assert!(result
        .insights
        .iter()
        .any(|i| i.content == "The dataset has 0 rows and 0 columns."));
}

// ============================================================================
// Scalar where a list was expected
// ============================================================================

#[tokio::test]
async fn test_single_insight_object_becomes_one_element_list() {
    let reply = "SUMMARY: ok\nINSIGHTS: {\"type\":\"anomaly\",\"title\":\"Spike\",\"content\":\"March returns doubled\"}\nRECOMMENDATIONS: [{\"title\":\"R\",\"description\":\"D\"}]";
    let orchestrator = orchestrator_for(ScriptedProvider::replying(ProviderType::OpenAI, reply));
    let outcome = orchestrator.analyze_detailed(&sales_request()).await;

    assert_eq!(outcome.path, CompletionPath::Parsed);
    assert_eq!(outcome.result.insights.len(), 1);
    assert_eq!(outcome.result.insights[0].insight_type, InsightType::Anomaly);
    assert_eq!(outcome.result.insights[0].confidence_score, Some(0.8));
}

// ============================================================================
// Wrapped replies
// ============================================================================

#[tokio::test]
async fn test_markdown_wrapped_reply_from_reasoning_model() {
    let reply = "<think>The user wants SUMMARY: and INSIGHTS: sections.</think>\n\
**SUMMARY:** Returns cluster in spring.\n\n\
## INSIGHTS:\n```json\n[{\"type\":\"pattern\",\"title\":\"Spring returns\",\"content\":\"Most returns happen in March\",\"confidenceScore\":72}]\n```\n\n\
## RECOMMENDATIONS:\n```json\n{\"title\":\"Audit sizing\",\"description\":\"Check size charts\",\"impact\":\"medium\",\"effort\":\"low\",\"actionSteps\":[\"Pull return reasons\"]}\n```";
    let orchestrator = orchestrator_for(ScriptedProvider::replying(ProviderType::DeepSeek, reply));
    let outcome = orchestrator.analyze_detailed(&sales_request()).await;

    assert_eq!(outcome.path, CompletionPath::Parsed);
    let result = outcome.result;
    assert_eq!(result.summary, "Returns cluster in spring.");
    assert_eq!(result.insights[0].confidence_score, Some(0.72));
    assert_eq!(result.recommendations[0].effort, Level::Low);
    assert_eq!(
        result.recommendations[0].action_steps,
        Some(vec!["Pull return reasons".to_string()])
    );
}
