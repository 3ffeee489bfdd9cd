//! # Resilink Stream
//!
//! A reconnecting client for JSON-over-WebSocket endpoints.
//!
//! [`StreamClient`] keeps one connection alive, parses every inbound frame
//! as JSON and fans it out to message listeners. Unexpected closes are
//! followed by reconnection with exponential backoff until the attempt
//! budget is spent, at which point error listeners receive
//! [`StreamError::ReconnectExhausted`]. A deliberate
//! [`disconnect`](StreamClient::disconnect) never reconnects.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use resilink_stream::{StreamClient, StreamConfig};
//!
//! # fn example() -> resilink_stream::StreamResult<()> {
//! let client = StreamClient::new(
//!     StreamConfig::new("wss://example.com/ws/updates/").with_auth_token("secret"),
//! )?;
//! client.on_message(Arc::new(|message: &serde_json::Value| println!("update: {message}")));
//! client.on_connection_change(Arc::new(|connected: bool| println!("connected: {connected}")));
//! client.connect();
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! ```text
//! resilink-stream/
//! ├── client      # StreamClient: sessions, reconnect timers, sending
//! ├── state       # Pure connection state machine
//! ├── config      # Endpoint and backoff configuration
//! ├── connector   # Connector trait and the WebSocket implementation
//! ├── memory      # In-memory connector for tests
//! ├── listeners   # Listener registries
//! └── error       # StreamError
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,  // Millisecond durations logged as u64
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod client;
pub mod config;
pub mod connector;
pub mod error;
pub mod listeners;
pub mod memory;
pub mod state;

pub use client::StreamClient;
pub use config::{ReconnectConfig, StreamConfig};
pub use connector::{Connection, Connector, Frame, FrameSink, FrameStream, WebSocketConnector};
pub use error::{StreamError, StreamResult};
pub use listeners::{
    ConnectionListener, ErrorListener, ListenerId, ListenerSet, Listeners, MessageListener,
};
pub use memory::{MemoryConnector, MemoryPeer};
pub use state::{CloseOutcome, ConnectionState, StreamState};
