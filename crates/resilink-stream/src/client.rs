//! Reconnecting stream client
//!
//! [`StreamClient`] keeps at most one connection to its endpoint alive. Each
//! connection attempt runs as a session task owning the connection: it
//! writes queued outbound frames, parses inbound frames and fans them out to
//! message listeners, and reports the close back to the client, which asks
//! the [`StreamState`] machine whether and when to reconnect.
//!
//! Sessions and reconnect timers are tagged with an epoch. `connect()` and
//! `disconnect()` bump it, so events from a superseded session or a timer
//! that lost a race with `disconnect()` are ignored.
//!
//! Listener callbacks never run while internal locks are held, so they may
//! call back into the client.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt as _, StreamExt as _};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::config::StreamConfig;
use crate::connector::{Connection, Connector, Frame, WebSocketConnector};
use crate::error::{StreamError, StreamResult};
use crate::listeners::{
    ConnectionListener, ErrorListener, ListenerId, Listeners, MessageListener,
};
use crate::state::{CloseOutcome, ConnectionState, StreamState};

/// Reconnecting client for a JSON-over-WebSocket endpoint
///
/// Cloning yields another handle to the same client.
#[derive(Clone)]
pub struct StreamClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: StreamConfig,
    endpoint: Url,
    connector: Arc<dyn Connector>,
    shared: Mutex<Shared>,
    listeners: Listeners,
}

/// State guarded by one lock so transitions and epochs change together
struct Shared {
    machine: StreamState,
    epoch: u64,
    session: Option<Session>,
    reconnect_timer: Option<JoinHandle<()>>,
}

/// Handle to the live (or opening) connection
struct Session {
    shutdown: CancellationToken,
    /// Present once the connection is open
    outbound: Option<mpsc::UnboundedSender<Frame>>,
}

enum SessionEnd {
    Closed,
    Shutdown,
}

impl fmt::Debug for StreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.inner.shared.lock();
        f.debug_struct("StreamClient")
            .field("url", &self.inner.endpoint.as_str())
            .field("state", &shared.machine.state())
            .field("reconnect_attempts", &shared.machine.reconnect_attempts())
            .field("listeners", &self.inner.listeners)
            .finish()
    }
}

impl StreamClient {
    /// Create a client connecting over WebSocket.
    ///
    /// Fails with [`StreamError::InvalidUrl`] unless the URL is `ws` or `wss`.
    pub fn new(config: StreamConfig) -> StreamResult<Self> {
        Self::with_connector(config, WebSocketConnector::new())
    }

    /// Create a client opening connections through `connector`
    pub fn with_connector(config: StreamConfig, connector: impl Connector) -> StreamResult<Self> {
        Self::with_shared_connector(config, Arc::new(connector))
    }

    /// Create a client with an already shared connector
    pub fn with_shared_connector(
        config: StreamConfig,
        connector: Arc<dyn Connector>,
    ) -> StreamResult<Self> {
        let endpoint = config.endpoint()?;
        let machine = StreamState::new(config.reconnect.clone());

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                endpoint,
                connector,
                shared: Mutex::new(Shared {
                    machine,
                    epoch: 0,
                    session: None,
                    reconnect_timer: None,
                }),
                listeners: Listeners::default(),
            }),
        })
    }

    /// Open a connection unless one is already connecting or open.
    ///
    /// Returns immediately; the outcome is reported through connection and
    /// error listeners. A pending reconnect timer is cancelled.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn connect(&self) {
        let mut shared = self.inner.shared.lock();
        start_session(&self.inner, &mut shared);
    }

    /// Close the connection deliberately. Never triggers reconnection.
    ///
    /// Cancels a pending reconnect timer, sends a close frame on a live
    /// connection, notifies `false` if a connection was open and resets the
    /// attempt counter so a later `connect()` starts a fresh cycle.
    pub fn disconnect(&self) {
        let was_open = {
            let mut shared = self.inner.shared.lock();
            if let Some(timer) = shared.reconnect_timer.take() {
                timer.abort();
                debug!("Cancelled pending stream reconnection");
            }
            shared.epoch += 1;
            if let Some(session) = shared.session.take() {
                session.shutdown.cancel();
            }
            shared.machine.on_disconnect()
        };

        info!(url = %self.inner.endpoint, "Stream disconnected");
        if was_open {
            self.inner.listeners.emit_connection(false);
        }
    }

    /// Serialize `payload` as JSON and queue it as a text frame.
    ///
    /// Every payload is JSON-encoded, so a string or a unit enum variant goes
    /// out quoted. Use [`send_text`](Self::send_text) to send a string raw.
    /// Returns `false` when the connection is not open.
    pub fn send_message<T: Serialize + ?Sized>(&self, payload: &T) -> bool {
        match serde_json::to_string(payload) {
            Ok(text) => self.send_text(&text),
            Err(error) => {
                warn!(%error, "Failed to serialize stream message");
                false
            }
        }
    }

    /// Queue a text frame. Returns `false` when the connection is not open.
    pub fn send_text(&self, text: &str) -> bool {
        let shared = self.inner.shared.lock();
        if shared.machine.state() != ConnectionState::Open {
            debug!(state = %shared.machine.state(), "Dropping outbound message; stream not open");
            return false;
        }

        shared
            .session
            .as_ref()
            .and_then(|session| session.outbound.as_ref())
            .is_some_and(|outbound| outbound.send(Frame::text(text)).is_ok())
    }

    /// Register a message listener
    pub fn on_message(&self, listener: MessageListener) -> ListenerId {
        self.inner.listeners.messages.add(listener)
    }

    /// Register a connection state listener
    pub fn on_connection_change(&self, listener: ConnectionListener) -> ListenerId {
        self.inner.listeners.connection.add(listener)
    }

    /// Register an error listener
    pub fn on_error(&self, listener: ErrorListener) -> ListenerId {
        self.inner.listeners.errors.add(listener)
    }

    /// Remove a message listener by identity
    pub fn remove_message_listener(&self, listener: &MessageListener) -> bool {
        self.inner.listeners.messages.remove_listener(listener)
    }

    /// Remove a connection state listener by identity
    pub fn remove_connection_listener(&self, listener: &ConnectionListener) -> bool {
        self.inner.listeners.connection.remove_listener(listener)
    }

    /// Remove an error listener by identity
    pub fn remove_error_listener(&self, listener: &ErrorListener) -> bool {
        self.inner.listeners.errors.remove_listener(listener)
    }

    /// Remove any registration by handle
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let listeners = &self.inner.listeners;
        listeners.messages.remove(id) || listeners.connection.remove(id) || listeners.errors.remove(id)
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().machine.state()
    }

    /// Whether the connection is open
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Consecutive reconnects scheduled since the last open
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.shared.lock().machine.reconnect_attempts()
    }

    /// The validated endpoint
    pub fn url(&self) -> &Url {
        &self.inner.endpoint
    }

    /// Client configuration
    pub fn config(&self) -> &StreamConfig {
        &self.inner.config
    }
}

/// Begin a connection attempt if the state machine allows it.
fn start_session(inner: &Arc<ClientInner>, shared: &mut Shared) -> bool {
    if !shared.machine.begin_connect() {
        trace!(state = %shared.machine.state(), "connect() ignored; stream already active");
        return false;
    }

    if let Some(timer) = shared.reconnect_timer.take() {
        timer.abort();
    }
    if let Some(stale) = shared.session.take() {
        stale.shutdown.cancel();
    }

    shared.epoch += 1;
    let epoch = shared.epoch;
    let shutdown = CancellationToken::new();
    shared.session = Some(Session {
        shutdown: shutdown.clone(),
        outbound: None,
    });

    debug!(url = %inner.endpoint, epoch, "Opening stream connection");
    tokio::spawn(run_session(Arc::clone(inner), epoch, shutdown));
    true
}

async fn run_session(inner: Arc<ClientInner>, epoch: u64, shutdown: CancellationToken) {
    let connected = tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            inner.finish_shutdown();
            return;
        }
        result = inner.connector.connect(&inner.endpoint) => result,
    };

    let connection = match connected {
        Ok(connection) => connection,
        Err(error) => {
            let error = match error {
                StreamError::ConnectionFailed(_) => error,
                other => StreamError::ConnectionFailed(other.to_string()),
            };
            warn!(url = %inner.endpoint, %error, "Stream connection failed");
            inner.listeners.emit_error(&error);
            handle_close(&inner, epoch);
            return;
        }
    };

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    {
        let mut shared = inner.shared.lock();
        if shared.epoch != epoch {
            // Disconnected while the connection was opening
            shared.machine.on_shutdown_complete();
            return;
        }
        shared.machine.on_open();

        if let Some(token) = &inner.config.auth_token {
            let frame = json!({ "type": "authenticate", "token": token }).to_string();
            // Queued before any caller can observe the open state
            let _ = outbound_tx.send(Frame::Text(frame));
        }
        if let Some(session) = shared.session.as_mut() {
            session.outbound = Some(outbound_tx);
        }
    }

    info!(url = %inner.endpoint, "Stream connected");
    inner.listeners.emit_connection(true);

    match drive(&inner, connection, outbound_rx, &shutdown).await {
        SessionEnd::Closed => handle_close(&inner, epoch),
        SessionEnd::Shutdown => inner.finish_shutdown(),
    }
}

/// Pump frames until the peer closes, the transport fails or a shutdown is
/// requested.
async fn drive(
    inner: &ClientInner,
    connection: Connection,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    shutdown: &CancellationToken,
) -> SessionEnd {
    let Connection {
        mut sink,
        mut stream,
    } = connection;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                if let Err(error) = sink.send(Frame::Close(None)).await {
                    debug!(%error, "Close frame not delivered");
                }
                let _ = sink.close().await;
                return SessionEnd::Shutdown;
            }
            Some(frame) = outbound.recv() => {
                if let Err(error) = sink.send(frame).await {
                    warn!(%error, "Failed to write stream frame");
                    inner.listeners.emit_error(&error);
                    return SessionEnd::Closed;
                }
            }
            incoming = stream.next() => match incoming {
                Some(Ok(Frame::Text(text))) => inner.dispatch(text.as_bytes()),
                Some(Ok(Frame::Binary(data))) => inner.dispatch(&data),
                Some(Ok(Frame::Ping(_) | Frame::Pong(_))) => {}
                Some(Ok(Frame::Close(reason))) => {
                    debug!(?reason, "Peer closed stream");
                    return SessionEnd::Closed;
                }
                Some(Err(error)) => {
                    // The connection is treated as closed after a read error;
                    // the close drives reconnection, not the error itself.
                    warn!(%error, "Stream transport error");
                    inner.listeners.emit_error(&error);
                    return SessionEnd::Closed;
                }
                None => return SessionEnd::Closed,
            }
        }
    }
}

/// Apply a close of the session tagged `epoch`.
fn handle_close(inner: &Arc<ClientInner>, epoch: u64) {
    let outcome = {
        let mut shared = inner.shared.lock();
        if shared.epoch != epoch {
            // Superseded by a disconnect, possibly from an error listener
            shared.machine.on_shutdown_complete();
            return;
        }
        shared.session = None;

        let outcome = shared.machine.on_close();
        if let CloseOutcome::Reconnect { attempt, delay } = outcome {
            info!(
                attempt,
                max_attempts = shared.machine.config().max_attempts,
                delay_ms = delay.as_millis() as u64,
                "Scheduling stream reconnection"
            );
            shared.reconnect_timer = Some(spawn_reconnect(Arc::clone(inner), epoch, delay));
        }
        outcome
    };

    inner.listeners.emit_connection(false);

    match outcome {
        CloseOutcome::Exhausted { attempts } => {
            error!(
                url = %inner.endpoint,
                attempts,
                "Maximum stream reconnection attempts reached"
            );
            inner
                .listeners
                .emit_error(&StreamError::ReconnectExhausted { attempts });
        }
        CloseOutcome::Stopped => debug!("Stream closed; reconnection disabled"),
        CloseOutcome::Reconnect { .. } => {}
    }
}

fn spawn_reconnect(inner: Arc<ClientInner>, epoch: u64, delay: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;

        let mut shared = inner.shared.lock();
        if shared.epoch != epoch {
            return;
        }
        shared.reconnect_timer = None;
        start_session(&inner, &mut shared);
    })
}

impl ClientInner {
    fn dispatch(&self, payload: &[u8]) {
        match serde_json::from_slice::<Value>(payload) {
            Ok(message) => self.listeners.emit_message(&message),
            Err(error) => {
                warn!(%error, len = payload.len(), "Dropping unparseable stream frame");
            }
        }
    }

    fn finish_shutdown(&self) {
        self.shared.lock().machine.on_shutdown_complete();
    }
}
