//! Explicit connection state machine
//!
//! [`StreamState`] holds the lifecycle state and reconnect counter and
//! decides what happens on each event. It performs no I/O; the client
//! applies its decisions (scheduling timers, notifying listeners).
//!
//! ```text
//! Idle ──connect──▶ Connecting ──open──▶ Open ──disconnect──▶ Closing
//!                       │                  │                     │
//!                     close              close                shutdown
//!                       ▼                  ▼                     ▼
//!                     Closed ◀─────────────┴─────────────────────┘
//!                       │
//!                 timer / connect
//!                       ▼
//!                   Connecting
//! ```

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::config::ReconnectConfig;

/// Lifecycle state of the underlying connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Never connected
    Idle,
    /// Opening a connection
    Connecting,
    /// Connection established
    Open,
    /// Deliberate shutdown in progress
    Closing,
    /// No live connection
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Decision taken when a connection closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Reconnect after `delay`; `attempt` is the new attempt count
    Reconnect {
        /// Attempt number, starting at 1
        attempt: u32,
        /// Backoff delay before reconnecting
        delay: Duration,
    },
    /// The attempt budget is spent; surface a terminal error
    Exhausted {
        /// Attempts made
        attempts: u32,
    },
    /// Reconnection is disabled or the client was shut down deliberately
    Stopped,
}

/// Connection lifecycle and reconnect bookkeeping
#[derive(Debug, Clone)]
pub struct StreamState {
    state: ConnectionState,
    reconnect_attempts: u32,
    config: ReconnectConfig,
}

impl StreamState {
    /// Create an idle state machine
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            state: ConnectionState::Idle,
            reconnect_attempts: 0,
            config,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive reconnects scheduled since the last open
    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    /// Reconnection policy in force
    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    /// Start a connection attempt. Returns `false` (no-op) while one is
    /// already connecting or open.
    pub fn begin_connect(&mut self) -> bool {
        match self.state {
            ConnectionState::Connecting | ConnectionState::Open => false,
            ConnectionState::Idle | ConnectionState::Closing | ConnectionState::Closed => {
                self.state = ConnectionState::Connecting;
                true
            }
        }
    }

    /// The connection opened; the attempt counter resets.
    pub fn on_open(&mut self) {
        self.state = ConnectionState::Open;
        self.reconnect_attempts = 0;
    }

    /// The connection closed or failed to open.
    pub fn on_close(&mut self) -> CloseOutcome {
        self.state = ConnectionState::Closed;

        if !self.config.enabled {
            return CloseOutcome::Stopped;
        }
        if self.reconnect_attempts >= self.config.max_attempts {
            return CloseOutcome::Exhausted {
                attempts: self.reconnect_attempts,
            };
        }

        self.reconnect_attempts += 1;
        CloseOutcome::Reconnect {
            attempt: self.reconnect_attempts,
            delay: self.config.delay_for(self.reconnect_attempts),
        }
    }

    /// Deliberate shutdown. Returns whether a connection was open.
    ///
    /// A live or opening connection moves to `Closing` until
    /// [`on_shutdown_complete`](Self::on_shutdown_complete); otherwise the
    /// state is left as is.
    pub fn on_disconnect(&mut self) -> bool {
        let was_open = self.state == ConnectionState::Open;
        if matches!(
            self.state,
            ConnectionState::Open | ConnectionState::Connecting
        ) {
            self.state = ConnectionState::Closing;
        }
        self.reconnect_attempts = 0;
        was_open
    }

    /// The connection torn down by a disconnect has finished closing.
    pub fn on_shutdown_complete(&mut self) {
        if self.state == ConnectionState::Closing {
            self.state = ConnectionState::Closed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_is_noop_while_connecting_or_open() {
        let mut machine = StreamState::new(ReconnectConfig::default());
        assert_eq!(machine.state(), ConnectionState::Idle);

        assert!(machine.begin_connect());
        assert!(!machine.begin_connect());

        machine.on_open();
        assert!(!machine.begin_connect());
        assert_eq!(machine.state(), ConnectionState::Open);
    }

    #[test]
    fn test_close_sequence_until_exhausted() {
        let mut machine = StreamState::new(ReconnectConfig::default());
        machine.begin_connect();

        let mut outcomes = Vec::new();
        for _ in 0..6 {
            outcomes.push(machine.on_close());
            machine.begin_connect();
        }

        let expected_delays = [2000u64, 4000, 8000, 16_000, 30_000];
        for (i, delay) in expected_delays.iter().enumerate() {
            assert_eq!(
                outcomes[i],
                CloseOutcome::Reconnect {
                    attempt: i as u32 + 1,
                    delay: Duration::from_millis(*delay),
                }
            );
        }
        assert_eq!(outcomes[5], CloseOutcome::Exhausted { attempts: 5 });
    }

    #[test]
    fn test_open_resets_attempts() {
        let mut machine = StreamState::new(ReconnectConfig::default());
        machine.begin_connect();
        machine.on_close();
        machine.begin_connect();
        machine.on_close();
        assert_eq!(machine.reconnect_attempts(), 2);

        machine.begin_connect();
        machine.on_open();
        assert_eq!(machine.reconnect_attempts(), 0);
    }

    #[test]
    fn test_disabled_reconnect_stops() {
        let mut machine = StreamState::new(ReconnectConfig::disabled());
        machine.begin_connect();
        assert_eq!(machine.on_close(), CloseOutcome::Stopped);
        assert_eq!(machine.reconnect_attempts(), 0);
    }

    #[test]
    fn test_disconnect_reports_live_connection() {
        let mut machine = StreamState::new(ReconnectConfig::default());
        assert!(!machine.on_disconnect());
        assert_eq!(machine.state(), ConnectionState::Idle);

        machine.begin_connect();
        machine.on_close();
        machine.begin_connect();
        machine.on_open();
        assert!(machine.on_disconnect());
        assert_eq!(machine.state(), ConnectionState::Closing);
        assert_eq!(machine.reconnect_attempts(), 0);

        machine.on_shutdown_complete();
        assert_eq!(machine.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_connect_allowed_while_closing() {
        let mut machine = StreamState::new(ReconnectConfig::default());
        machine.begin_connect();
        machine.on_open();
        machine.on_disconnect();

        assert!(machine.begin_connect());
        // A stale shutdown completion does not clobber the new attempt
        machine.on_shutdown_complete();
        assert_eq!(machine.state(), ConnectionState::Connecting);
    }
}
