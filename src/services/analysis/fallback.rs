//! Fallback Generator
//!
//! Builds a schema-valid result from the dataset summary alone. Used when the
//! provider call fails or when a reply yields nothing usable, so callers see
//! the same shape on every path.

use insightflow_core::{
    AnalysisResult, DatasetSummary, Insight, InsightType, Level, Recommendation,
    FALLBACK_METADATA_KEY,
};
use serde_json::{Map, Value};

/// Model tag stamped on fallback items
pub const FALLBACK_MODEL: &str = "fallback";

const OVERVIEW_CONFIDENCE: f64 = 0.6;
const STRUCTURE_CONFIDENCE: f64 = 0.9;

/// Full fallback result for `dataset`, tagged with `provider_tag`.
///
/// Deterministic: ids are derived from the provider tag, not from time.
pub fn fallback(dataset: &DatasetSummary, provider_tag: &str) -> AnalysisResult {
    AnalysisResult {
        summary: fallback_summary(dataset),
        insights: fallback_insights(dataset, provider_tag),
        recommendations: fallback_recommendations(provider_tag),
    }
}

pub fn fallback_summary(dataset: &DatasetSummary) -> String {
    if dataset.is_empty() {
        "Automated analysis was unavailable. The uploaded dataset did not report its size; review it manually before drawing conclusions.".to_string()
    } else {
        format!(
            "Automated analysis was unavailable. The uploaded dataset contains {} rows across {} columns; the items below are generic starting points.",
            dataset.row_count, dataset.column_count
        )
    }
}

pub fn fallback_insights(dataset: &DatasetSummary, provider_tag: &str) -> Vec<Insight> {
    let overview = Insight::new(
        InsightType::Summary,
        "Data Overview",
        "The dataset was received and profiled, but no detailed analysis could be generated for it.",
    )
    .with_confidence(OVERVIEW_CONFIDENCE);

    let structure_text = format!(
        "The dataset has {} rows and {} columns.",
        dataset.row_count, dataset.column_count
    );
    let structure = Insight::new(InsightType::Trend, "Dataset Structure", structure_text)
        .with_confidence(STRUCTURE_CONFIDENCE);

    vec![overview, structure]
        .into_iter()
        .map(|mut insight| {
            insight.metadata = fallback_metadata();
            insight.provider = provider_tag.to_string();
            insight.ai_model = FALLBACK_MODEL.to_string();
            insight
        })
        .collect()
}

pub fn fallback_recommendations(provider_tag: &str) -> Vec<Recommendation> {
    let mut quality = Recommendation::new(
        "Review Data Quality",
        "Check the dataset for missing values, duplicates and inconsistent formats before relying on any analysis.",
    );
    quality.impact = Level::High;
    quality.effort = Level::Low;
    quality.category = "data_quality".to_string();
    quality.action_steps = Some(vec![
        "Count missing values per column".to_string(),
        "Remove duplicate rows".to_string(),
        "Standardize date and number formats".to_string(),
    ]);

    let mut metrics = Recommendation::new(
        "Explore Key Metrics",
        "Identify the columns that matter most to the business and track how they change over time.",
    );
    metrics.impact = Level::Medium;
    metrics.effort = Level::Medium;
    metrics.category = "analysis".to_string();
    metrics.action_steps = Some(vec![
        "Pick two or three headline metrics".to_string(),
        "Chart them over time".to_string(),
        "Re-run the analysis once the data is cleaned".to_string(),
    ]);

    vec![quality, metrics]
        .into_iter()
        .enumerate()
        .map(|(i, mut rec)| {
            rec.id = format!("{}-fallback-{}", provider_tag, i + 1);
            rec.metadata = fallback_metadata();
            rec.provider = provider_tag.to_string();
            rec.ai_model = FALLBACK_MODEL.to_string();
            rec
        })
        .collect()
}

fn fallback_metadata() -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert(FALLBACK_METADATA_KEY.to_string(), Value::Bool(true));
    metadata
}
