//! Services
//!
//! Business logic of the pipeline.

pub mod analysis;

pub use analysis::{AnalysisAdapter, AnalysisOutcome, CompletionPath, Orchestrator, ProviderAdapter};
