//! InsightFlow Core
//!
//! Foundational types for the InsightFlow workspace. This crate has no
//! dependency on provider transports or the analysis pipeline itself.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `dataset` - Inbound request shape (`AnalysisRequest`, `DatasetSummary`, `UserContext`)
//! - `analysis` - Outbound result shape (`AnalysisResult`, `Insight`, `Recommendation`)

pub mod analysis;
pub mod dataset;
pub mod error;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Request Types ──────────────────────────────────────────────────────
pub use dataset::{
    AnalysisRequest, ColumnProfile, ColumnType, DatasetSummary, NumericSummary, UserContext,
    DEFAULT_INDUSTRY, DEFAULT_PLAN_TYPE, DEFAULT_ROLE,
};

// ── Result Types ───────────────────────────────────────────────────────
pub use analysis::{
    AnalysisResult, Insight, InsightType, Level, Recommendation, FALLBACK_METADATA_KEY,
};
