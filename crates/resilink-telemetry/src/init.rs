//! Subscriber installation
//!
//! [`TelemetryGuard`] installs one global `tracing` subscriber: an
//! [`EnvFilter`] followed by a JSON or human-readable `fmt` layer.

use tracing::info;
use tracing_subscriber::{
    Registry, filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{TelemetryConfig, TelemetryError, TelemetryResult};

/// Handle for an installed subscriber
///
/// Hold it in `main()` for as long as the program logs; dropping it emits a
/// final shutdown event.
///
/// ```rust,no_run
/// use resilink_telemetry::TelemetryConfig;
///
/// # fn main() -> resilink_telemetry::TelemetryResult<()> {
/// let _telemetry = TelemetryConfig::default().init()?;
/// tracing::info!("ready");
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TelemetryGuard {
    config: TelemetryConfig,
}

impl TelemetryGuard {
    /// Install the global subscriber.
    ///
    /// Fails if the filter does not parse or a subscriber is already set.
    pub fn init(config: TelemetryConfig) -> TelemetryResult<Self> {
        init_subscriber(&config)?;

        info!(
            service_name = %config.service_name,
            service_version = %config.service_version,
            json_logs = config.json_logs,
            stderr_output = config.stderr_output,
            "Resilink telemetry initialized"
        );

        Ok(Self { config })
    }

    /// Get the service name
    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.config.service_name
    }

    /// Get the configuration
    #[must_use]
    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        info!(
            service_name = %self.config.service_name,
            "Shutting down resilink telemetry"
        );
    }
}

/// Resolve the filter: `RUST_LOG` first, then the configured directives.
pub fn env_filter(config: &TelemetryConfig) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::InvalidConfiguration(format!("Invalid log level: {e}")))
}

fn init_subscriber(config: &TelemetryConfig) -> TelemetryResult<()> {
    let env_filter = env_filter(config)?;

    // Each layer combination is a distinct type, hence one branch per combination
    match (config.json_logs, config.stderr_output) {
        (true, true) => Registry::default()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json(),
            )
            .try_init(),
        (true, false) => Registry::default()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .json(),
            )
            .try_init(),
        (false, true) => Registry::default()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .compact(),
            )
            .try_init(),
        (false, false) => Registry::default()
            .with(env_filter)
            .with(fmt::layer().with_target(true).compact())
            .try_init(),
    }
    .map_err(|e| TelemetryError::TracingError(e.to_string()))
}
