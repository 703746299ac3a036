//! InsightFlow - Generative Analysis Pipeline
//!
//! Takes a parsed dataset summary plus business context, asks one of several
//! interchangeable LLM providers for an analysis, and returns a normalized
//! `{summary, insights, recommendations}` result whether the provider
//! answered cleanly, answered badly, or failed outright.
//! It includes:
//! - Pipeline configuration loaded from TOML
//! - The analysis service (context, prompts, extraction, fallback,
//!   normalization, orchestration)
//! - Error types

pub mod config;
pub mod services;
pub mod utils;

pub use config::{FallbackPolicy, PipelineConfig};
pub use insightflow_core::{
    AnalysisRequest, AnalysisResult, DatasetSummary, Insight, InsightType, Level,
    Recommendation, UserContext,
};
pub use services::analysis::{AnalysisOutcome, CompletionPath, Orchestrator};
pub use utils::error::{AnalysisError, PipelineResult, ProviderError, ProviderErrorKind};
