//! Pipeline Integration Tests
//!
//! Orchestrator behaviour independent of reply content: cancellation,
//! fallback policy, caller-side retry and determinism.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use insightflow::services::analysis::{extract, fallback, normalize, NormalizationContext};
use insightflow::{
    AnalysisError, CompletionPath, FallbackPolicy, Orchestrator, PipelineConfig,
};
use insightflow_llm::{
    LlmError, LlmProvider, LlmResponse, ProviderType, RetryConfig, RetryingProvider,
};
use tokio_util::sync::CancellationToken;

use super::support::{sales_request, ScriptedProvider, WELL_FORMED_REPLY};

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancellation_aborts_in_flight_call() {
    let provider = ScriptedProvider::replying(ProviderType::OpenAI, WELL_FORMED_REPLY)
        .with_delay(Duration::from_secs(30))
        .into_arc();
    let orchestrator = Orchestrator::with_provider(
        provider.clone(),
        &PipelineConfig::for_provider(ProviderType::OpenAI),
    );

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.cancel();
    });

    let result = orchestrator
        .analyze_with_cancellation(&sales_request(), token)
        .await;
    assert!(matches!(result, Err(AnalysisError::Cancelled)));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_uncancelled_request_completes() {
    let orchestrator = Orchestrator::with_provider(
        ScriptedProvider::replying(ProviderType::OpenAI, WELL_FORMED_REPLY).into_arc(),
        &PipelineConfig::for_provider(ProviderType::OpenAI),
    );
    let result = orchestrator
        .analyze_with_cancellation(&sales_request(), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.summary, "ok");
}

#[tokio::test]
async fn test_cancelled_before_start_never_calls_provider() {
    let provider = ScriptedProvider::replying(ProviderType::OpenAI, WELL_FORMED_REPLY).into_arc();
    let orchestrator = Orchestrator::with_provider(
        provider.clone(),
        &PipelineConfig::for_provider(ProviderType::OpenAI),
    );
    let token = CancellationToken::new();
    token.cancel();

    let result = orchestrator
        .analyze_with_cancellation(&sales_request(), token)
        .await;
    assert!(matches!(result, Err(AnalysisError::Cancelled)));
    assert_eq!(provider.calls(), 0);
}

// ============================================================================
// Fallback policy
// ============================================================================

#[tokio::test]
async fn test_field_level_policy_keeps_parsed_sections() {
    let reply = "SUMMARY: ok\nINSIGHTS: [{\"title\":\"T\",\"content\":\"C\"}]\nRECOMMENDATIONS: [broken";
    let orchestrator = Orchestrator::with_provider(
        ScriptedProvider::replying(ProviderType::Anthropic, reply).into_arc(),
        &PipelineConfig::for_provider(ProviderType::Anthropic),
    );
    let outcome = orchestrator.analyze_detailed(&sales_request()).await;

    assert_eq!(outcome.path, CompletionPath::Degraded);
    assert!(outcome.error_class.is_none());
    assert!(!outcome.result.insights[0].is_fallback());
    assert!(outcome.result.recommendations.iter().all(|r| r.is_fallback()));
}

#[tokio::test]
async fn test_strict_policy_falls_back_on_any_list_failure() {
    let reply = "SUMMARY: ok\nINSIGHTS: [{\"title\":\"T\",\"content\":\"C\"}]\nRECOMMENDATIONS: [broken";
    let mut config = PipelineConfig::for_provider(ProviderType::Anthropic);
    config.fallback_policy = FallbackPolicy::Strict;
    let orchestrator = Orchestrator::with_provider(
        ScriptedProvider::replying(ProviderType::Anthropic, reply).into_arc(),
        &config,
    );
    let outcome = orchestrator.analyze_detailed(&sales_request()).await;

    assert_eq!(outcome.path, CompletionPath::Fallback);
    assert_eq!(outcome.error_class.as_deref(), Some("unparseable_reply"));
    assert_eq!(outcome.result.summary, "ok");
    assert!(outcome.result.is_full_fallback());
}

#[tokio::test]
async fn test_unstructured_prose_reply_is_full_fallback() {
    let request = sales_request();
    let orchestrator = Orchestrator::with_provider(
        ScriptedProvider::replying(ProviderType::Ollama, "I could not read the data, sorry.")
            .into_arc(),
        &PipelineConfig::for_provider(ProviderType::Ollama),
    );
    let outcome = orchestrator.analyze_detailed(&request).await;

    assert_eq!(outcome.path, CompletionPath::Fallback);
    assert_eq!(outcome.error_class.as_deref(), Some("unparseable_reply"));
    assert_eq!(outcome.result, fallback(&request.dataset, "ollama"));
}

#[tokio::test]
async fn test_configured_default_confidence_applies() {
    let reply = "SUMMARY: ok\nINSIGHTS: [{\"title\":\"T\",\"content\":\"C\"}]\nRECOMMENDATIONS: [{\"title\":\"R\",\"description\":\"D\"}]";
    let mut config = PipelineConfig::for_provider(ProviderType::Glm);
    config.default_confidence = Some(0.42);
    let orchestrator = Orchestrator::with_provider(
        ScriptedProvider::replying(ProviderType::Glm, reply).into_arc(),
        &config,
    );
    let result = orchestrator.analyze(&sales_request()).await;
    assert_eq!(result.insights[0].confidence_score, Some(0.42));
}

// ============================================================================
// Caller-side retry
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_retrying_transport_recovers_before_fallback() {
    let inner = ScriptedProvider::new(
        ProviderType::OpenAI,
        vec![
            Err(LlmError::ServerError {
                message: "bad gateway".to_string(),
                status: Some(502),
            }),
            Ok(LlmResponse::text(WELL_FORMED_REPLY, "gpt-4o")),
        ],
    )
    .into_arc();
    let retrying: Arc<dyn LlmProvider> = Arc::new(RetryingProvider::new(
        inner.clone(),
        RetryConfig {
            initial_interval: Duration::from_millis(10),
            ..RetryConfig::default()
        },
    ));
    let orchestrator = Orchestrator::with_provider(
        retrying,
        &PipelineConfig::for_provider(ProviderType::OpenAI),
    );

    let outcome = orchestrator.analyze_detailed(&sales_request()).await;
    assert_eq!(outcome.path, CompletionPath::Parsed);
    assert_eq!(inner.calls(), 2);
}

#[tokio::test]
async fn test_orchestrator_itself_never_retries() {
    let provider = ScriptedProvider::failing(
        ProviderType::OpenAI,
        LlmError::RateLimited {
            message: "slow down".to_string(),
            retry_after: Some(1),
        },
    )
    .into_arc();
    let orchestrator = Orchestrator::with_provider(
        provider.clone(),
        &PipelineConfig::for_provider(ProviderType::OpenAI),
    );

    let outcome = orchestrator.analyze_detailed(&sales_request()).await;
    assert_eq!(outcome.error_class.as_deref(), Some("rate_limited"));
    assert_eq!(provider.calls(), 1);
}

// ============================================================================
// Determinism and idempotence
// ============================================================================

#[tokio::test]
async fn test_repeated_runs_agree_except_for_synthesized_ids() {
    let orchestrator = Orchestrator::with_provider(
        ScriptedProvider::replying(ProviderType::OpenAI, WELL_FORMED_REPLY).into_arc(),
        &PipelineConfig::for_provider(ProviderType::OpenAI),
    );
    let request = sales_request();
    let mut first = orchestrator.analyze(&request).await;
    let mut second = orchestrator.analyze(&request).await;

    for rec in first
        .recommendations
        .iter_mut()
        .chain(second.recommendations.iter_mut())
    {
        rec.id.clear();
    }
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_pipeline_output_is_a_normalization_fixed_point() {
    let orchestrator = Orchestrator::with_provider(
        ScriptedProvider::replying(ProviderType::DeepSeek, WELL_FORMED_REPLY).into_arc(),
        &PipelineConfig::for_provider(ProviderType::DeepSeek),
    );
    let result = orchestrator.analyze(&sales_request()).await;
    let ctx = NormalizationContext::new("other", "other-model", 0.1);
    assert_eq!(normalize(result.clone(), &ctx), result);
}

#[test]
fn test_extraction_is_total_over_odd_inputs() {
    let inputs = [
        "",
        "SUMMARY:",
        "INSIGHTS:INSIGHTS:INSIGHTS:",
        "RECOMMENDATIONS: [[[[",
        "<think>",
        "SUMMARY: \u{1F4C8} growth",
        "```",
    ];
    for input in inputs {
        assert_eq!(extract(input), extract(input));
    }
}

#[tokio::test]
async fn test_every_provider_path_yields_complete_result() {
    for provider in [
        ProviderType::Anthropic,
        ProviderType::OpenAI,
        ProviderType::DeepSeek,
        ProviderType::Glm,
        ProviderType::Ollama,
    ] {
        let orchestrator = Orchestrator::with_provider(
            ScriptedProvider::failing(
                provider,
                LlmError::NetworkError {
                    message: "connection refused".to_string(),
                },
            )
            .into_arc(),
            &PipelineConfig::for_provider(provider),
        );
        let result = orchestrator.analyze(&sales_request()).await;

        assert!(!result.insights.is_empty());
        assert!(!result.recommendations.is_empty());
        let ids: HashSet<&str> = result.recommendations.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), result.recommendations.len());
        assert!(ids.iter().all(|id| !id.is_empty()));
        assert!(result
            .insights
            .iter()
            .all(|i| i.provider == provider.to_string()));
    }
}
