//! Retry with exponential backoff for transient provider errors
//!
//! `RetryingProvider` decorates any `LlmProvider`. The analysis pipeline
//! itself never retries; callers opt in by wrapping the transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::{backoff::Backoff, ExponentialBackoff};

use crate::provider::LlmProvider;
use crate::types::{LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 means no retries)
    pub max_retries: u32,
    /// Initial backoff duration
    pub initial_interval: Duration,
    /// Maximum backoff duration
    pub max_interval: Duration,
    /// Multiplier for backoff between retries
    pub multiplier: f64,
    /// Randomization applied to each interval
    pub randomization_factor: f64,
    /// Maximum total time to spend retrying
    pub max_elapsed_time: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
            randomization_factor: 0.2,
            max_elapsed_time: Some(Duration::from_secs(60)),
        }
    }
}

impl RetryConfig {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            current_interval: self.initial_interval,
            max_interval: self.max_interval,
            multiplier: self.multiplier,
            randomization_factor: self.randomization_factor,
            max_elapsed_time: self.max_elapsed_time,
            ..ExponentialBackoff::default()
        }
    }
}

/// Provider decorator that retries transient failures.
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    config: RetryConfig,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Wait before the next attempt, honoring a provider `Retry-After` hint
    /// when it is longer than the computed backoff.
    fn delay_for(err: &LlmError, computed: Duration) -> Duration {
        match err.retry_after() {
            Some(secs) => computed.max(Duration::from_secs(u64::from(secs))),
            None => computed,
        }
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    fn context_window(&self) -> u32 {
        self.inner.context_window()
    }

    async fn send_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let mut backoff = self.config.backoff();
        let mut attempts = 0;

        loop {
            let result = self
                .inner
                .send_message(messages.clone(), system.clone(), request_options.clone())
                .await;

            match result {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempts < self.config.max_retries => {
                    let Some(wait) = backoff.next_backoff() else {
                        return Err(err);
                    };
                    let wait = Self::delay_for(&err, wait);
                    tracing::warn!(
                        provider = self.inner.name(),
                        error_class = err.class(),
                        attempt = attempts + 1,
                        max_retries = self.config.max_retries,
                        "Transient provider error, retrying in {:?}",
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempts += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn health_check(&self) -> LlmResult<()> {
        self.inner.health_check().await
    }

    fn config(&self) -> &ProviderConfig {
        self.inner.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyProvider {
        config: ProviderConfig,
        calls: AtomicUsize,
        failures: usize,
        error: LlmError,
    }

    #[async_trait]
    impl LlmProvider for FlakyProvider {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn model(&self) -> &str {
            &self.config.model
        }

        async fn send_message(
            &self,
            _messages: Vec<Message>,
            _system: Option<String>,
            _request_options: LlmRequestOptions,
        ) -> LlmResult<LlmResponse> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(LlmResponse::text("SUMMARY: ok", "flaky-1"))
            }
        }

        async fn health_check(&self) -> LlmResult<()> {
            Ok(())
        }

        fn config(&self) -> &ProviderConfig {
            &self.config
        }
    }

    fn fast_config(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            ..RetryConfig::default()
        }
    }

    fn flaky(failures: usize, error: LlmError) -> Arc<FlakyProvider> {
        Arc::new(FlakyProvider {
            config: ProviderConfig::default(),
            calls: AtomicUsize::new(0),
            failures,
            error,
        })
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let inner = flaky(
            2,
            LlmError::ServerError {
                message: "overloaded".to_string(),
                status: Some(503),
            },
        );
        let provider = RetryingProvider::new(inner.clone(), fast_config(3));
        let response = provider
            .send_message(vec![Message::user("x")], None, LlmRequestOptions::default())
            .await
            .unwrap();
        assert_eq!(response.content.as_deref(), Some("SUMMARY: ok"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let inner = flaky(
            5,
            LlmError::AuthenticationFailed {
                message: "bad key".to_string(),
            },
        );
        let provider = RetryingProvider::new(inner.clone(), fast_config(3));
        let err = provider
            .send_message(vec![Message::user("x")], None, LlmRequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed { .. }));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let inner = flaky(
            10,
            LlmError::NetworkError {
                message: "reset".to_string(),
            },
        );
        let provider = RetryingProvider::new(inner.clone(), fast_config(2));
        let err = provider
            .send_message(vec![Message::user("x")], None, LlmRequestOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NetworkError { .. }));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(provider.name(), "flaky");
    }

    #[test]
    fn test_retry_after_extends_delay() {
        let limited = LlmError::RateLimited {
            message: "slow down".to_string(),
            retry_after: Some(2),
        };
        assert_eq!(
            RetryingProvider::delay_for(&limited, Duration::from_millis(100)),
            Duration::from_secs(2)
        );
        let network = LlmError::NetworkError {
            message: "reset".to_string(),
        };
        assert_eq!(
            RetryingProvider::delay_for(&network, Duration::from_millis(100)),
            Duration::from_millis(100)
        );
    }
}
