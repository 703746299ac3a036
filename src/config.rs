//! Pipeline Configuration
//!
//! Loaded from TOML. Every field has a default so an empty document is a
//! valid configuration for the default provider.
//!
//! ```toml
//! request_timeout_secs = 45
//! fallback_policy = "strict"
//!
//! [provider]
//! provider = "openai"
//! model = "gpt-4o"
//! ```

use std::path::Path;
use std::time::Duration;

use insightflow_core::{CoreError, CoreResult};
use insightflow_llm::{LlmError, ProviderConfig, ProviderType};
use serde::{Deserialize, Serialize};

/// Environment variable consulted before the provider's own key variable.
pub const API_KEY_ENV: &str = "INSIGHTFLOW_API_KEY";

/// What to do when only part of a reply could be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Substitute fallback content only for the sections that failed
    #[default]
    FieldLevel,
    /// Any list-section failure replaces both lists with fallback content
    Strict,
}

/// Top-level configuration of one analysis pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub provider: ProviderConfig,
    /// Upper bound on the single provider call
    pub request_timeout_secs: u64,
    /// Sample rows included in the prompt context
    pub max_sample_rows: usize,
    pub fallback_policy: FallbackPolicy,
    /// Overrides the provider's default confidence for unscored insights
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_confidence: Option<f64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            request_timeout_secs: 60,
            max_sample_rows: 5,
            fallback_policy: FallbackPolicy::default(),
            default_confidence: None,
        }
    }
}

impl PipelineConfig {
    /// Config for `provider` with every other field defaulted
    pub fn for_provider(provider: ProviderType) -> Self {
        Self {
            provider: ProviderConfig::for_provider(provider),
            ..Default::default()
        }
    }

    /// Parse and validate a TOML document.
    ///
    /// Provider aliases (`claude`, `zhipu`) are accepted, and a `[provider]`
    /// table that names a provider but no model gets that provider's default
    /// model.
    pub fn from_toml_str(content: &str) -> CoreResult<Self> {
        let mut raw: toml::Table = toml::from_str(content)
            .map_err(|e| CoreError::parse(format!("Failed to parse pipeline config: {}", e)))?;

        if let Some(table) = raw.get_mut("provider").and_then(|p| p.as_table_mut()) {
            if let Some(name) = table.get("provider").and_then(|v| v.as_str()) {
                let provider: ProviderType = name
                    .parse()
                    .map_err(|e: LlmError| CoreError::config(e.to_string()))?;
                table.insert(
                    "provider".to_string(),
                    toml::Value::String(provider.to_string()),
                );
                if !table.contains_key("model") {
                    table.insert(
                        "model".to_string(),
                        toml::Value::String(provider.default_model().to_string()),
                    );
                }
            }
        }

        let config: PipelineConfig = toml::Value::Table(raw)
            .try_into()
            .map_err(|e| CoreError::config(format!("Invalid pipeline config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.request_timeout_secs == 0 {
            return Err(CoreError::validation(
                "request_timeout_secs must be greater than zero",
            ));
        }
        if self.provider.model.trim().is_empty() {
            return Err(CoreError::validation("provider model must not be empty"));
        }
        if let Some(confidence) = self.default_confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(CoreError::validation(format!(
                    "default_confidence must be within [0, 1], got {}",
                    confidence
                )));
            }
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Fill a missing API key from the environment.
    ///
    /// `INSIGHTFLOW_API_KEY` wins over the provider's conventional variable
    /// (e.g. `OPENAI_API_KEY`). A key already present in the file is kept.
    pub fn resolve_api_key_from_env(&mut self) {
        self.resolve_api_key_with(|name| std::env::var(name).ok());
    }

    fn resolve_api_key_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.provider.api_key.is_some() || !self.provider.provider.requires_api_key() {
            return;
        }
        let candidates = std::iter::once(API_KEY_ENV).chain(self.provider.provider.api_key_env_var());
        for name in candidates {
            if let Some(key) = lookup(name).filter(|k| !k.trim().is_empty()) {
                tracing::debug!(provider = %self.provider.provider, source = name, "Resolved API key from environment");
                self.provider.api_key = Some(key);
                return;
            }
        }
        tracing::warn!(provider = %self.provider.provider, "No API key configured");
    }
}
