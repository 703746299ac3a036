//! Analysis Result Types
//!
//! The single result contract produced by every provider adapter and by the
//! fallback path. Serialized in camelCase so the persistence collaborator
//! receives `confidenceScore`, `aiModel` and `actionSteps` keys.

use serde::{Deserialize, Serialize};

/// Metadata key marking an item produced by the fallback generator.
pub const FALLBACK_METADATA_KEY: &str = "fallback";

/// Category of an insight.
///
/// Unknown values are kept verbatim in `Other` rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InsightType {
    Summary,
    Trend,
    Anomaly,
    Correlation,
    Prediction,
    Recommendation,
    Pattern,
    Opportunity,
    Risk,
    Other(String),
}

impl InsightType {
    pub fn as_str(&self) -> &str {
        match self {
            InsightType::Summary => "summary",
            InsightType::Trend => "trend",
            InsightType::Anomaly => "anomaly",
            InsightType::Correlation => "correlation",
            InsightType::Prediction => "prediction",
            InsightType::Recommendation => "recommendation",
            InsightType::Pattern => "pattern",
            InsightType::Opportunity => "opportunity",
            InsightType::Risk => "risk",
            InsightType::Other(other) => other.as_str(),
        }
    }
}

impl From<&str> for InsightType {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "summary" => InsightType::Summary,
            "trend" => InsightType::Trend,
            "anomaly" => InsightType::Anomaly,
            "correlation" => InsightType::Correlation,
            "prediction" => InsightType::Prediction,
            "recommendation" => InsightType::Recommendation,
            "pattern" => InsightType::Pattern,
            "opportunity" => InsightType::Opportunity,
            "risk" => InsightType::Risk,
            _ => InsightType::Other(s.trim().to_string()),
        }
    }
}

impl From<String> for InsightType {
    fn from(s: String) -> Self {
        InsightType::from(s.as_str())
    }
}

impl From<InsightType> for String {
    fn from(t: InsightType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for InsightType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Impact / effort rating of a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    High,
    Medium,
    Low,
}

impl Level {
    /// Lenient parse of a provider-supplied rating ("high", "MED", "Low impact").
    pub fn parse(s: &str) -> Option<Level> {
        let lower = s.trim().to_lowercase();
        if lower.starts_with("high") {
            Some(Level::High)
        } else if lower.starts_with("med") {
            Some(Level::Medium)
        } else if lower.starts_with("low") {
            Some(Level::Low)
        } else {
            None
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Self::Medium
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::High => write!(f, "High"),
            Level::Medium => write!(f, "Medium"),
            Level::Low => write!(f, "Low"),
        }
    }
}

/// A single observation about the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub content: String,
    /// Always populated once the result has been normalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub ai_model: String,
    #[serde(default)]
    pub provider: String,
}

impl Insight {
    pub fn new(
        insight_type: InsightType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            insight_type,
            title: title.into(),
            content: content.into(),
            confidence_score: None,
            metadata: serde_json::Map::new(),
            ai_model: String::new(),
            provider: String::new(),
        }
    }

    pub fn with_confidence(mut self, score: f64) -> Self {
        self.confidence_score = Some(score);
        self
    }

    pub fn is_fallback(&self) -> bool {
        is_fallback_metadata(&self.metadata)
    }
}

/// An actionable suggestion derived from the dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    /// Always non-empty once the result has been normalized.
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub impact: Level,
    #[serde(default)]
    pub effort: Level,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_steps: Option<Vec<String>>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub ai_model: String,
    #[serde(default)]
    pub provider: String,
}

impl Recommendation {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            description: description.into(),
            impact: Level::default(),
            effort: Level::default(),
            category: String::new(),
            details: None,
            action_steps: None,
            metadata: serde_json::Map::new(),
            ai_model: String::new(),
            provider: String::new(),
        }
    }

    pub fn is_fallback(&self) -> bool {
        is_fallback_metadata(&self.metadata)
    }
}

/// The normalized output of one pipeline invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub summary: String,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
}

impl AnalysisResult {
    /// True when any item in the result came from the fallback generator.
    pub fn has_fallback_content(&self) -> bool {
        self.insights.iter().any(Insight::is_fallback)
            || self.recommendations.iter().any(Recommendation::is_fallback)
    }

    /// True when every item in the result came from the fallback generator.
    pub fn is_full_fallback(&self) -> bool {
        !self.insights.is_empty()
            && !self.recommendations.is_empty()
            && self.insights.iter().all(Insight::is_fallback)
            && self.recommendations.iter().all(Recommendation::is_fallback)
    }
}

fn is_fallback_metadata(metadata: &serde_json::Map<String, serde_json::Value>) -> bool {
    metadata
        .get(FALLBACK_METADATA_KEY)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insight_type_known_and_unknown() {
        assert_eq!(InsightType::from("Trend"), InsightType::Trend);
        assert_eq!(InsightType::from(" Prediction "), InsightType::Prediction);
        assert_eq!(
            InsightType::from("forecast"),
            InsightType::Other("forecast".to_string())
        );
        assert_eq!(
            InsightType::from("seasonality"),
            InsightType::Other("seasonality".to_string())
        );
    }

    #[test]
    fn test_unknown_insight_type_survives_serialization() {
        let insight = Insight::new(InsightType::from("seasonality"), "T", "C");
        let json = serde_json::to_value(&insight).unwrap();
        assert_eq!(json["type"], "seasonality");

        let parsed: Insight = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.insight_type.as_str(), "seasonality");
    }

    #[test]
    fn test_level_parse_is_lenient() {
        assert_eq!(Level::parse("HIGH"), Some(Level::High));
        assert_eq!(Level::parse("med"), Some(Level::Medium));
        assert_eq!(Level::parse("Low effort"), Some(Level::Low));
        assert_eq!(Level::parse("urgent"), None);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let mut rec = Recommendation::new("R", "D");
        rec.action_steps = Some(vec!["step".to_string()]);
        rec.ai_model = "gpt-4o".to_string();
        let result = AnalysisResult {
            summary: "ok".to_string(),
            insights: vec![Insight::new(InsightType::Trend, "T", "C").with_confidence(0.9)],
            recommendations: vec![rec],
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["insights"][0]["confidenceScore"], 0.9);
        assert_eq!(json["recommendations"][0]["actionSteps"][0], "step");
        assert_eq!(json["recommendations"][0]["aiModel"], "gpt-4o");
        assert_eq!(json["recommendations"][0]["impact"], "Medium");
    }

    #[test]
    fn test_fallback_detection() {
        let mut insight = Insight::new(InsightType::Summary, "T", "C");
        insight
            .metadata
            .insert(FALLBACK_METADATA_KEY.to_string(), serde_json::Value::Bool(true));
        let mut rec = Recommendation::new("R", "D");
        rec.metadata
            .insert(FALLBACK_METADATA_KEY.to_string(), serde_json::Value::Bool(true));

        let result = AnalysisResult {
            summary: String::new(),
            insights: vec![insight],
            recommendations: vec![rec],
        };
        assert!(result.has_fallback_content());
        assert!(result.is_full_fallback());
        assert!(!AnalysisResult::default().has_fallback_content());
    }
}
