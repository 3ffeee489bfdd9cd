//! Configuration types for the stream client

use std::time::Duration;

use url::Url;

use crate::error::{StreamError, StreamResult};

/// Stream client configuration
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Endpoint URL (`ws://` or `wss://`)
    pub url: String,

    /// Token sent in an `authenticate` frame after every successful open
    pub auth_token: Option<String>,

    /// Reconnection configuration
    pub reconnect: ReconnectConfig,
}

impl StreamConfig {
    /// Create a configuration for the given endpoint with default reconnection
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Set the authentication token
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    /// Set reconnection configuration
    pub fn with_reconnect_config(mut self, config: ReconnectConfig) -> Self {
        self.reconnect = config;
        self
    }

    /// Parse the endpoint, rejecting anything but `ws` and `wss`.
    pub fn endpoint(&self) -> StreamResult<Url> {
        let url = Url::parse(&self.url)?;
        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(StreamError::InvalidUrl(format!(
                "unsupported scheme '{other}' in {}, expected ws or wss",
                self.url
            ))),
        }
    }
}

/// Reconnection configuration
///
/// After the `n`th consecutive close the client waits
/// `min(base_delay * 2^n, max_delay)` before reconnecting, and gives up once
/// `max_attempts` reconnects have been scheduled without an open in between.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Enable automatic reconnection
    pub enabled: bool,

    /// Delay unit doubled per attempt
    pub base_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Maximum consecutive reconnection attempts
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            max_attempts: 5,
        }
    }
}

impl ReconnectConfig {
    /// Create new reconnection configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable reconnection
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Create aggressive reconnection policy
    pub fn aggressive() -> Self {
        Self {
            enabled: true,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            max_attempts: 20,
        }
    }

    /// Create conservative reconnection policy
    pub fn conservative() -> Self {
        Self {
            enabled: true,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            max_attempts: 5,
        }
    }

    /// Set whether reconnection is enabled
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set maximum attempts
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Backoff delay for the given attempt count: `min(base * 2^attempts, max)`.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let factor = 2u32.checked_pow(attempts).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}
