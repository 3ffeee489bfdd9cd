//! Logging configuration

use serde::{Deserialize, Serialize};

/// Default filter: informational output, with debug detail from resilink crates
pub const DEFAULT_LOG_LEVEL: &str = "info,resilink=debug";

/// Logging configuration
///
/// `RUST_LOG`, when set, takes precedence over [`log_level`](Self::log_level).
///
/// ```rust
/// use resilink_telemetry::TelemetryConfig;
///
/// let config = TelemetryConfig::builder()
///     .service_name("order-dashboard")
///     .log_level("warn,resilink_stream=debug")
///     .json_logs(false)
///     .build();
/// assert!(!config.json_logs);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Name reported in the startup event
    pub service_name: String,
    /// Version reported in the startup event
    pub service_version: String,
    /// `EnvFilter` directives, e.g. `"info,resilink=debug"`
    pub log_level: String,
    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
    /// Write to stderr instead of stdout
    pub stderr_output: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "resilink".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            json_logs: false,
            stderr_output: true,
        }
    }
}

impl TelemetryConfig {
    /// Create a new configuration builder
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    /// Install the global subscriber
    ///
    /// Keep the returned guard alive for the lifetime of the program.
    pub fn init(self) -> crate::TelemetryResult<crate::TelemetryGuard> {
        crate::TelemetryGuard::init(self)
    }
}

/// Builder for [`TelemetryConfig`]
#[derive(Debug, Clone, Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    service_version: Option<String>,
    log_level: Option<String>,
    json_logs: Option<bool>,
    stderr_output: Option<bool>,
}

impl TelemetryConfigBuilder {
    /// Set the service name
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set the service version
    #[must_use]
    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// Set the filter directives
    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Enable or disable JSON output
    #[must_use]
    pub fn json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = Some(enabled);
        self
    }

    /// Enable or disable stderr output
    #[must_use]
    pub fn stderr_output(mut self, enabled: bool) -> Self {
        self.stderr_output = Some(enabled);
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        let defaults = TelemetryConfig::default();

        TelemetryConfig {
            service_name: self.service_name.unwrap_or(defaults.service_name),
            service_version: self.service_version.unwrap_or(defaults.service_version),
            log_level: self.log_level.unwrap_or(defaults.log_level),
            json_logs: self.json_logs.unwrap_or(defaults.json_logs),
            stderr_output: self.stderr_output.unwrap_or(defaults.stderr_output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "resilink");
        assert_eq!(config.log_level, "info,resilink=debug");
        assert!(!config.json_logs);
        assert!(config.stderr_output);
    }

    #[test]
    fn test_builder_overrides_only_what_is_set() {
        let config = TelemetryConfig::builder()
            .service_name("dashboard")
            .json_logs(true)
            .build();

        assert_eq!(config.service_name, "dashboard");
        assert!(config.json_logs);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let config: TelemetryConfig = serde_json::from_str(r#"{"json_logs": true}"#).unwrap();
        assert!(config.json_logs);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }
}
