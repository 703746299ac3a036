//! Error Handling
//!
//! Pipeline error types. Uses thiserror for ergonomic error definitions.
//!
//! `ProviderError` messages are built only from the provider tag, the error
//! class and (for HTTP failures) the status code, so they are safe to log.

use insightflow_core::CoreError;
use insightflow_llm::LlmError;
use thiserror::Error;

/// Normalized class of a failed provider call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    Authentication,
    RateLimited,
    ModelNotFound,
    InvalidRequest,
    Server,
    Network,
    Timeout,
    Unavailable,
    /// The transport answered but the envelope could not be decoded
    MalformedResponse,
    Other,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::Authentication => "authentication_failed",
            ProviderErrorKind::RateLimited => "rate_limited",
            ProviderErrorKind::ModelNotFound => "model_not_found",
            ProviderErrorKind::InvalidRequest => "invalid_request",
            ProviderErrorKind::Server => "server_error",
            ProviderErrorKind::Network => "network_error",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Unavailable => "provider_unavailable",
            ProviderErrorKind::MalformedResponse => "malformed_response",
            ProviderErrorKind::Other => "other",
        }
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single error type surfaced by an analysis adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{provider} request failed: {kind}{}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, kind: ProviderErrorKind) -> Self {
        Self {
            provider: provider.into(),
            kind,
            status: None,
        }
    }

    /// Create a timeout error
    pub fn timeout(provider: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Timeout)
    }

    /// Normalize a transport error. The transport's message is dropped
    /// because it may echo upstream response bodies.
    pub fn from_llm(provider: impl Into<String>, err: &LlmError) -> Self {
        let kind = match err {
            LlmError::AuthenticationFailed { .. } => ProviderErrorKind::Authentication,
            LlmError::RateLimited { .. } => ProviderErrorKind::RateLimited,
            LlmError::ModelNotFound { .. } => ProviderErrorKind::ModelNotFound,
            LlmError::InvalidRequest { .. } => ProviderErrorKind::InvalidRequest,
            LlmError::ServerError { .. } => ProviderErrorKind::Server,
            LlmError::NetworkError { .. } => ProviderErrorKind::Network,
            LlmError::Timeout { .. } => ProviderErrorKind::Timeout,
            LlmError::ParseError { .. } => ProviderErrorKind::MalformedResponse,
            LlmError::ProviderUnavailable { .. } => ProviderErrorKind::Unavailable,
            LlmError::Other { .. } => ProviderErrorKind::Other,
        };
        let status = match err {
            LlmError::ServerError { status, .. } => *status,
            _ => None,
        };
        Self {
            provider: provider.into(),
            kind,
            status,
        }
    }

    /// Short class name for logs and outcome reporting
    pub fn class(&self) -> &'static str {
        self.kind.as_str()
    }
}

/// Errors from driving the pipeline itself
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The caller cancelled the request; no result is produced
    #[error("Analysis cancelled")]
    Cancelled,

    /// Pipeline configuration could not be loaded or is invalid
    #[error(transparent)]
    Config(#[from] CoreError),
}

/// Result type alias for pipeline errors
pub type PipelineResult<T> = Result<T, AnalysisError>;
