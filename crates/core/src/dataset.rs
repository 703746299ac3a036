//! Dataset & Request Types
//!
//! The inbound side of the pipeline: a parsed dataset summary produced by the
//! file-parsing collaborator plus the user context supplied by the gating
//! subsystem. Every field is optional on the wire so a partially populated
//! summary still deserializes.

use serde::{Deserialize, Serialize};

/// Industry used when the user context does not carry one.
pub const DEFAULT_INDUSTRY: &str = "general";
/// Role used when the user context does not carry one.
pub const DEFAULT_ROLE: &str = "business_analyst";
/// Plan tier used when the user context does not carry one.
pub const DEFAULT_PLAN_TYPE: &str = "basic";

/// Inferred type of a dataset column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Numeric,
    Text,
    Date,
    Boolean,
    Categorical,
    #[serde(other)]
    Unknown,
}

impl Default for ColumnType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::Text => write!(f, "text"),
            ColumnType::Date => write!(f, "date"),
            ColumnType::Boolean => write!(f, "boolean"),
            ColumnType::Categorical => write!(f, "categorical"),
            ColumnType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Profile of a single column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnProfile {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub null_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_count: Option<u64>,
}

/// Descriptive statistics for one numeric column
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NumericSummary {
    pub column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub std_dev: Option<f64>,
}

/// Row/column statistics for an uploaded file (the `fileData` input)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetSummary {
    pub row_count: u64,
    pub column_count: u64,
    pub columns: Vec<ColumnProfile>,
    pub sample_rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub statistics: Vec<NumericSummary>,
}

impl DatasetSummary {
    /// Create a summary with only the shape filled in
    pub fn with_shape(row_count: u64, column_count: u64) -> Self {
        Self {
            row_count,
            column_count,
            ..Default::default()
        }
    }

    /// True when the summary carries no rows and no column information.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0 && self.column_count == 0 && self.columns.is_empty()
    }
}

/// Business context injected by the trial/subscription gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<String>,
}

impl UserContext {
    /// Industry, or `"general"` when absent or blank
    pub fn industry(&self) -> &str {
        non_blank(self.industry.as_deref()).unwrap_or(DEFAULT_INDUSTRY)
    }

    /// Role, or `"business_analyst"` when absent or blank
    pub fn role(&self) -> &str {
        non_blank(self.role.as_deref()).unwrap_or(DEFAULT_ROLE)
    }

    /// Plan tier, or `"basic"` when absent or blank
    pub fn plan_type(&self) -> &str {
        non_blank(self.plan_type.as_deref()).unwrap_or(DEFAULT_PLAN_TYPE)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A single pipeline invocation's input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisRequest {
    pub file_name: String,
    pub dataset: DatasetSummary,
    pub user_context: UserContext,
}

impl AnalysisRequest {
    pub fn new(
        file_name: impl Into<String>,
        dataset: DatasetSummary,
        user_context: UserContext,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            dataset,
            user_context,
        }
    }
}
