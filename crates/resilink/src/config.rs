//! Client configuration
//!
//! [`ClientConfig`] gathers the settings of every resilink component in one
//! serde structure. It loads from an optional TOML, YAML or JSON file layered
//! under `RESILINK_*` environment variables, with `__` separating nested
//! keys:
//!
//! ```text
//! RESILINK_STREAM__URL=wss://api.example.com/ws/updates/
//! RESILINK_STREAM__RECONNECT__MAX_ATTEMPTS=10
//! RESILINK_REQUEST__TIMEOUT_MS=5000
//! ```
//!
//! Every field has a default, so an empty file (or none at all) is valid.

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use resilink_reporter::DEFAULT_STORE_CAPACITY;
use resilink_request::{
    BatchConfig, DEFAULT_BATCH_CONCURRENCY, DEFAULT_CACHE_MAX_AGE, DEFAULT_DEBOUNCE_WAIT,
    DEFAULT_THROTTLE_LIMIT, DEFAULT_TIMEOUT, RetryConfig,
};
use resilink_stream::{ReconnectConfig, StreamConfig};
use resilink_telemetry::{DEFAULT_LOG_LEVEL, TelemetryConfig};

use crate::error::ConfigError;

/// Default environment variable prefix
pub const ENV_PREFIX: &str = "RESILINK";

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Streaming connection
    pub stream: StreamSection,
    /// Request decorator defaults
    pub request: RequestSection,
    /// Error reporting
    pub reporter: ReporterSection,
    /// Logging
    pub telemetry: TelemetrySection,
}

/// `[stream]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSection {
    /// `ws://` or `wss://` endpoint; no stream client is started without one
    pub url: Option<String>,
    /// Token sent in an `authenticate` frame after each open
    pub auth_token: Option<String>,
    /// Reconnection policy
    pub reconnect: ReconnectSection,
}

/// `[stream.reconnect]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSection {
    /// Reconnect after unexpected closes
    pub enabled: bool,
    /// Backoff base in milliseconds
    pub base_delay_ms: u64,
    /// Backoff cap in milliseconds
    pub max_delay_ms: u64,
    /// Reconnects allowed before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectSection {
    fn default() -> Self {
        let defaults = ReconnectConfig::default();
        Self {
            enabled: defaults.enabled,
            base_delay_ms: defaults.base_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            max_attempts: defaults.max_attempts,
        }
    }
}

/// `[request]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSection {
    /// Retries after the first attempt
    pub retries: u32,
    /// Delay between attempts in milliseconds
    pub retry_delay_ms: u64,
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Cache entry lifetime in milliseconds
    pub cache_max_age_ms: u64,
    /// Debounce quiet period in milliseconds
    pub debounce_wait_ms: u64,
    /// Throttle window in milliseconds
    pub throttle_limit_ms: u64,
    /// Calls per parallel batch group
    pub batch_concurrency: usize,
}

impl Default for RequestSection {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            retries: retry.retries,
            retry_delay_ms: retry.retry_delay.as_millis() as u64,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            cache_max_age_ms: DEFAULT_CACHE_MAX_AGE.as_millis() as u64,
            debounce_wait_ms: DEFAULT_DEBOUNCE_WAIT.as_millis() as u64,
            throttle_limit_ms: DEFAULT_THROTTLE_LIMIT.as_millis() as u64,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }
}

/// `[reporter]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterSection {
    /// Collector base URL; records stay in memory without one
    pub base_url: Option<String>,
    /// Seconds between periodic flushes; 0 disables them
    pub flush_interval_secs: u64,
    /// Records buffered before the oldest are dropped
    pub capacity: usize,
}

impl Default for ReporterSection {
    fn default() -> Self {
        Self {
            base_url: None,
            flush_interval_secs: 60,
            capacity: DEFAULT_STORE_CAPACITY,
        }
    }
}

/// `[telemetry]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySection {
    /// Filter directives used when `RUST_LOG` is unset
    pub log_level: String,
    /// JSON output instead of compact text
    pub json_logs: bool,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
        }
    }
}

impl ClientConfig {
    /// Load from `RESILINK_*` environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None::<&Path>, ENV_PREFIX)
    }

    /// Load from a file, with `RESILINK_*` variables overriding it
    ///
    /// The format follows the extension: `.toml`, `.yaml`/`.yml` or `.json`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load(Some(path), ENV_PREFIX)
    }

    /// Load from an optional file layered under variables with `env_prefix`
    pub fn load(path: Option<impl AsRef<Path>>, env_prefix: &str) -> Result<Self, ConfigError> {
        Self::load_with(path, Self::environment(env_prefix))
    }

    /// Environment source for `prefix`: `<PREFIX>_SECTION__KEY`
    pub fn environment(prefix: &str) -> Environment {
        Environment::with_prefix(prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Load from an optional file layered under an explicit environment source
    pub fn load_with(
        path: Option<impl AsRef<Path>>,
        environment: Environment,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            let path = path.as_ref();
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.to_path_buf()));
            }
            let format = match path.extension().and_then(|s| s.to_str()) {
                Some("toml") => FileFormat::Toml,
                Some("yaml" | "yml") => FileFormat::Yaml,
                Some("json") => FileFormat::Json,
                _ => return Err(ConfigError::UnsupportedFormat),
            };
            let name = path.to_str().ok_or(ConfigError::UnsupportedFormat)?;
            builder = builder.add_source(File::new(name, format));
        }

        // Environment variables override file settings
        let config: Self = builder
            .add_source(environment)
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let reconnect = &self.stream.reconnect;
        if reconnect.max_delay_ms < reconnect.base_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "stream.reconnect.max_delay_ms ({}) is below base_delay_ms ({})",
                reconnect.max_delay_ms, reconnect.base_delay_ms
            )));
        }
        if self.request.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request.timeout_ms must be positive".to_string(),
            ));
        }
        if self.reporter.capacity == 0 {
            return Err(ConfigError::Invalid(
                "reporter.capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl StreamSection {
    /// Stream client configuration, or `None` when no URL is set
    pub fn to_stream_config(&self) -> Option<StreamConfig> {
        let url = self.url.as_deref()?;
        let mut config =
            StreamConfig::new(url).with_reconnect_config(self.reconnect.to_reconnect_config());
        if let Some(token) = &self.auth_token {
            config = config.with_auth_token(token.clone());
        }
        Some(config)
    }
}

impl ReconnectSection {
    /// Backoff policy for the stream client
    pub fn to_reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig::default()
            .with_enabled(self.enabled)
            .with_base_delay(Duration::from_millis(self.base_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_attempts(self.max_attempts)
    }
}

impl RequestSection {
    /// Retry policy retrying every error
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::default()
            .with_retries(self.retries)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
    }

    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache entry lifetime
    pub fn cache_max_age(&self) -> Duration {
        Duration::from_millis(self.cache_max_age_ms)
    }

    /// Debounce quiet period
    pub fn debounce_wait(&self) -> Duration {
        Duration::from_millis(self.debounce_wait_ms)
    }

    /// Throttle window
    pub fn throttle_limit(&self) -> Duration {
        Duration::from_millis(self.throttle_limit_ms)
    }

    /// Parallel batch grouping
    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig::parallel(self.batch_concurrency)
    }
}

impl ReporterSection {
    /// Periodic flush interval, `None` when disabled
    pub fn flush_interval(&self) -> Option<Duration> {
        (self.flush_interval_secs > 0).then(|| Duration::from_secs(self.flush_interval_secs))
    }
}

impl TelemetrySection {
    /// Subscriber configuration
    pub fn to_telemetry_config(&self, service_name: &str) -> TelemetryConfig {
        TelemetryConfig::builder()
            .service_name(service_name)
            .log_level(self.log_level.clone())
            .json_logs(self.json_logs)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_component_defaults() {
        let config = ClientConfig::default();

        assert_eq!(config.stream.url, None);
        assert_eq!(config.stream.reconnect.base_delay_ms, 1000);
        assert_eq!(config.stream.reconnect.max_delay_ms, 30_000);
        assert_eq!(config.stream.reconnect.max_attempts, 5);
        assert_eq!(config.request.retries, 3);
        assert_eq!(config.request.retry_delay_ms, 1000);
        assert_eq!(config.request.timeout_ms, 10_000);
        assert_eq!(config.request.cache_max_age_ms, 60_000);
        assert_eq!(config.request.debounce_wait_ms, 300);
        assert_eq!(config.request.throttle_limit_ms, 1000);
        assert_eq!(config.request.batch_concurrency, 5);
        assert_eq!(config.reporter.flush_interval_secs, 60);
        assert_eq!(config.reporter.capacity, 1000);
        assert_eq!(config.telemetry.log_level, "info,resilink=debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_stream_section_conversion() {
        let section = StreamSection {
            url: Some("wss://example.com/ws".to_string()),
            auth_token: Some("secret".to_string()),
            reconnect: ReconnectSection {
                enabled: true,
                base_delay_ms: 500,
                max_delay_ms: 4000,
                max_attempts: 2,
            },
        };

        let config = section.to_stream_config().unwrap();
        assert_eq!(config.url, "wss://example.com/ws");
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.reconnect.base_delay, Duration::from_millis(500));
        assert_eq!(config.reconnect.max_attempts, 2);

        assert!(StreamSection::default().to_stream_config().is_none());
    }

    #[test]
    fn test_validation_rejects_inverted_backoff() {
        let mut config = ClientConfig::default();
        config.stream.reconnect.max_delay_ms = 10;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_zero_flush_interval_disables_flushing() {
        let section = ReporterSection {
            flush_interval_secs: 0,
            ..ReporterSection::default()
        };
        assert_eq!(section.flush_interval(), None);
        assert_eq!(
            ReporterSection::default().flush_interval(),
            Some(Duration::from_secs(60))
        );
    }
}
