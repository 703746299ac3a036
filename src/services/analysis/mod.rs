//! Analysis Service
//!
//! Turns a dataset summary into a normalized `AnalysisResult` through one
//! LLM provider, falling back to generated content whenever the provider
//! fails or its reply cannot be parsed.

pub mod adapter;
pub mod context;
pub mod extractor;
pub mod fallback;
pub mod normalizer;
pub mod orchestrator;
pub mod prompts;

pub use adapter::{AnalysisAdapter, Interpretation, ProviderAdapter, ProviderReply};
pub use context::{build_analysis_context, ContextBuilder};
pub use extractor::{
    extract, extract_json_block, parse_insights, parse_recommendations, strip_code_fences,
    ParsedSections, Section, SectionError,
};
pub use fallback::{fallback, FALLBACK_MODEL};
pub use normalizer::{normalize, provider_default_confidence, NormalizationContext};
pub use orchestrator::{AnalysisOutcome, CompletionPath, Orchestrator, PipelineState};
pub use prompts::PromptTemplate;
