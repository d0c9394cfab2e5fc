//! Client configuration.
//!
//! A [`ClientConfig`] is assembled once through [`ClientConfigBuilder`] and
//! never changes afterwards. The environment is consulted only when the
//! builder is explicitly pointed at one with [`ClientConfigBuilder::from_env`].
//!
//! ```
//! use serpshot::ClientConfig;
//! use std::time::Duration;
//!
//! let config = ClientConfig::builder()
//!     .api_key("your-api-key")
//!     .timeout(Duration::from_secs(10))
//!     .max_retries(5)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.retry_policy().max_retries, 5);
//! ```

mod env;

use std::time::Duration;

pub use env::{Environment, SystemEnvironment};

#[cfg(test)]
pub(crate) use env::MockEnvironment;

use crate::auth::ApiKey;
use crate::error::{Result, SerpshotError};
use crate::http::RetryPolicy;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "SERPSHOT_API_KEY";

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.serpshot.com";

/// Per-attempt timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How a multi-query request is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchStrategy {
    /// One HTTP call carrying every query; the endpoint accepts a list.
    #[default]
    Combined,
    /// One HTTP call per query, reassembled in input order. The async
    /// client keeps up to `concurrency` calls in flight; the blocking
    /// client sends them one after another.
    FanOut { concurrency: usize },
}

/// Immutable settings owned by one client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    api_key: ApiKey,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
    batch: BatchStrategy,
}

impl ClientConfig {
    /// Starts a builder with every setting at its default.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Defaults everywhere, API key from `SERPSHOT_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::builder().from_env(&SystemEnvironment).build()
    }

    /// The resolved API key.
    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Timeout applied to each attempt.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retry and backoff settings.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// How multi-query requests are sent.
    pub fn batch_strategy(&self) -> BatchStrategy {
        self.batch
    }
}

/// Builder for [`ClientConfig`]. Every setting is optional except the API
/// key, which may come from the environment instead.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    api_key: Option<String>,
    env_api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    timeout_secs: Option<f64>,
    retry: RetryPolicy,
    batch: BatchStrategy,
}

impl ClientConfigBuilder {
    /// Explicit API key. Takes precedence over the environment.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Reads `SERPSHOT_API_KEY` from `env` as the fallback API key.
    pub fn from_env(mut self, env: &dyn Environment) -> Self {
        self.env_api_key = env.var(ENV_API_KEY).ok();
        self
    }

    /// Overrides the API endpoint, e.g. for a local mock server.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self.timeout_secs = None;
        self
    }

    /// Timeout in (fractional) seconds.
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.timeout_secs = Some(secs);
        self.timeout = None;
        self
    }

    /// Retries after the first attempt; `0` disables retrying.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// Delay before the first retry.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.retry.base_delay = delay;
        self
    }

    /// Upper bound for any single backoff delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.retry.max_delay = delay;
        self
    }

    /// Randomizes each backoff delay by ±50%.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.retry.jitter = jitter;
        self
    }

    /// Replaces all retry settings at once.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Chooses between one combined call and per-query fan-out.
    pub fn batch_strategy(mut self, strategy: BatchStrategy) -> Self {
        self.batch = strategy;
        self
    }

    /// Resolves the API key and validates every setting.
    pub fn build(self) -> Result<ClientConfig> {
        let explicit = self.api_key.filter(|k| !k.trim().is_empty());
        let api_key = match explicit.or(self.env_api_key) {
            Some(key) => ApiKey::new(key)?,
            None => {
                return Err(SerpshotError::Authentication(format!(
                    "API key is required. Either provide it explicitly or set the {} environment variable.",
                    ENV_API_KEY
                )));
            }
        };

        let base_url = self
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim()
            .trim_end_matches('/')
            .to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(SerpshotError::validation(
                "base_url",
                format!("base URL must start with http:// or https://, got '{}'", base_url),
            ));
        }

        let timeout = match (self.timeout, self.timeout_secs) {
            (Some(timeout), _) => timeout,
            (None, Some(secs)) => {
                if !secs.is_finite() || secs <= 0.0 {
                    return Err(SerpshotError::validation(
                        "timeout",
                        format!("timeout must be a positive number of seconds, got {}", secs),
                    ));
                }
                Duration::try_from_secs_f64(secs).map_err(|e| {
                    SerpshotError::validation("timeout", format!("invalid timeout: {}", e))
                })?
            }
            (None, None) => DEFAULT_TIMEOUT,
        };
        if timeout.is_zero() {
            return Err(SerpshotError::validation(
                "timeout",
                "timeout must be positive",
            ));
        }

        if self.retry.max_delay < self.retry.base_delay {
            return Err(SerpshotError::validation(
                "max_delay",
                "max_delay must not be shorter than base_delay",
            ));
        }

        if let BatchStrategy::FanOut { concurrency: 0 } = self.batch {
            return Err(SerpshotError::validation(
                "batch_strategy",
                "fan-out concurrency must be at least 1",
            ));
        }

        Ok(ClientConfig {
            api_key,
            base_url,
            timeout,
            retry: self.retry,
            batch: self.batch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn env_with_key(key: &'static str) -> MockEnvironment {
        let mut env = MockEnvironment::new();
        env.expect_var()
            .with(eq(ENV_API_KEY))
            .returning(move |_| Ok(key.to_string()));
        env
    }

    fn empty_env() -> MockEnvironment {
        let mut env = MockEnvironment::new();
        env.expect_var()
            .returning(|_| Err(std::env::VarError::NotPresent));
        env
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::builder().api_key("key-123456").build().unwrap();

        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.retry_policy(), &RetryPolicy::default());
        assert_eq!(config.batch_strategy(), BatchStrategy::Combined);
    }

    #[test]
    fn test_explicit_key_beats_environment() {
        let config = ClientConfig::builder()
            .from_env(&env_with_key("env-key-999999"))
            .api_key("explicit-key-1")
            .build()
            .unwrap();

        assert_eq!(config.api_key().expose(), "explicit-key-1");
    }

    #[test]
    fn test_environment_key_is_fallback() {
        let config = ClientConfig::builder()
            .from_env(&env_with_key("env-key-999999"))
            .build()
            .unwrap();

        assert_eq!(config.api_key().expose(), "env-key-999999");
    }

    #[test]
    fn test_blank_explicit_key_falls_back_to_environment() {
        let config = ClientConfig::builder()
            .api_key("   ")
            .from_env(&env_with_key("env-key-999999"))
            .build()
            .unwrap();

        assert_eq!(config.api_key().expose(), "env-key-999999");
    }

    #[test]
    fn test_missing_key() {
        let err = ClientConfig::builder().from_env(&empty_env()).build().unwrap_err();
        assert!(matches!(err, SerpshotError::Authentication(ref m) if m.contains(ENV_API_KEY)));
    }

    #[test]
    fn test_base_url_trailing_slash_removed() {
        let config = ClientConfig::builder()
            .api_key("key-123456")
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();
        assert_eq!(config.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_base_url_requires_scheme() {
        let err = ClientConfig::builder()
            .api_key("key-123456")
            .base_url("api.serpshot.com")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            SerpshotError::Validation {
                field: Some("base_url"),
                ..
            }
        ));
    }

    #[test]
    fn test_timeout_secs() {
        let config = ClientConfig::builder()
            .api_key("key-123456")
            .timeout_secs(2.5)
            .build()
            .unwrap();
        assert_eq!(config.timeout(), Duration::from_millis(2500));

        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(
                ClientConfig::builder()
                    .api_key("key-123456")
                    .timeout_secs(bad)
                    .build()
                    .is_err(),
                "timeout {} accepted",
                bad
            );
        }
    }

    #[test]
    fn test_zero_duration_timeout_rejected() {
        assert!(
            ClientConfig::builder()
                .api_key("key-123456")
                .timeout(Duration::ZERO)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_retry_settings() {
        let config = ClientConfig::builder()
            .api_key("key-123456")
            .max_retries(0)
            .base_delay(Duration::from_millis(10))
            .max_delay(Duration::from_millis(50))
            .jitter(true)
            .build()
            .unwrap();

        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 0);
        assert_eq!(policy.base_delay, Duration::from_millis(10));
        assert_eq!(policy.max_delay, Duration::from_millis(50));
        assert!(policy.jitter);
    }

    #[test]
    fn test_inverted_delays_rejected() {
        assert!(
            ClientConfig::builder()
                .api_key("key-123456")
                .base_delay(Duration::from_secs(60))
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_fan_out_needs_concurrency() {
        assert!(
            ClientConfig::builder()
                .api_key("key-123456")
                .batch_strategy(BatchStrategy::FanOut { concurrency: 0 })
                .build()
                .is_err()
        );
    }
}
