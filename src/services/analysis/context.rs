//! Context Builder
//!
//! Renders the dataset summary and user context into the provider-agnostic
//! text block that every prompt template embeds. Missing values are written
//! as `N/A` so the prompt is always well formed.

use std::fmt::Write;

use insightflow_core::{AnalysisRequest, DatasetSummary, NumericSummary};

/// Placeholder for any statistic the dataset summary does not carry
pub const NOT_AVAILABLE: &str = "N/A";

/// Sample rows rendered when no limit is configured
pub const DEFAULT_MAX_SAMPLE_ROWS: usize = 5;

/// Builds the analysis context block
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder {
    max_sample_rows: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SAMPLE_ROWS)
    }
}

impl ContextBuilder {
    pub fn new(max_sample_rows: usize) -> Self {
        Self { max_sample_rows }
    }

    pub fn build(&self, request: &AnalysisRequest) -> String {
        let ctx = &request.user_context;
        let dataset = &request.dataset;
        let mut out = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(out, "File: {}", or_na(request.file_name.trim()));
        let _ = writeln!(out, "Industry: {}", ctx.industry());
        let _ = writeln!(out, "Role: {}", ctx.role());
        let _ = writeln!(out, "Plan: {}", ctx.plan_type());
        out.push('\n');

        self.write_overview(&mut out, dataset);
        self.write_columns(&mut out, dataset);
        self.write_statistics(&mut out, &dataset.statistics);
        self.write_samples(&mut out, dataset);

        out.trim_end().to_string()
    }

    fn write_overview(&self, out: &mut String, dataset: &DatasetSummary) {
        let _ = writeln!(out, "Dataset overview:");
        if dataset.is_empty() {
            let _ = writeln!(out, "- Rows: {}", NOT_AVAILABLE);
            let _ = writeln!(out, "- Columns: {}", NOT_AVAILABLE);
        } else {
            let _ = writeln!(out, "- Rows: {}", dataset.row_count);
            let _ = writeln!(out, "- Columns: {}", dataset.column_count);
        }
        out.push('\n');
    }

    fn write_columns(&self, out: &mut String, dataset: &DatasetSummary) {
        let _ = writeln!(out, "Columns:");
        if dataset.columns.is_empty() {
            let _ = writeln!(out, "- {}", NOT_AVAILABLE);
        }
        for column in &dataset.columns {
            let _ = writeln!(
                out,
                "- {} ({}), nulls: {}, unique: {}",
                or_na(column.name.trim()),
                column.column_type,
                opt_na(column.null_count),
                opt_na(column.unique_count)
            );
        }
        out.push('\n');
    }

    fn write_statistics(&self, out: &mut String, statistics: &[NumericSummary]) {
        let _ = writeln!(out, "Summary statistics:");
        if statistics.is_empty() {
            let _ = writeln!(out, "- {}", NOT_AVAILABLE);
        }
        for stat in statistics {
            let _ = writeln!(
                out,
                "- {}: min={}, max={}, mean={}, median={}, std_dev={}",
                or_na(stat.column.trim()),
                num_na(stat.min),
                num_na(stat.max),
                num_na(stat.mean),
                num_na(stat.median),
                num_na(stat.std_dev)
            );
        }
        out.push('\n');
    }

    fn write_samples(&self, out: &mut String, dataset: &DatasetSummary) {
        let shown = dataset.sample_rows.len().min(self.max_sample_rows);
        let _ = writeln!(
            out,
            "Sample rows ({} of {}):",
            shown,
            dataset.sample_rows.len()
        );
        if shown == 0 {
            let _ = writeln!(out, "- {}", NOT_AVAILABLE);
        }
        for (i, row) in dataset.sample_rows.iter().take(shown).enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, serde_json::Value::Object(row.clone()));
        }
    }
}

/// Render the context block with the default sample-row limit.
pub fn build_analysis_context(request: &AnalysisRequest) -> String {
    ContextBuilder::default().build(request)
}

fn or_na(value: &str) -> &str {
    if value.is_empty() {
        NOT_AVAILABLE
    } else {
        value
    }
}

fn opt_na(value: Option<u64>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}

fn num_na(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{:.2}", v),
        _ => NOT_AVAILABLE.to_string(),
    }
}
