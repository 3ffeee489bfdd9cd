//! Connection factory abstraction
//!
//! The client never talks to a socket library directly. A [`Connector`]
//! opens a [`Connection`], a pair of frame sink and frame stream, which lets
//! the reconnect logic run against [`WebSocketConnector`] in production and
//! an in-memory connector in tests.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, SinkExt as _, Stream, StreamExt as _, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};
use url::Url;

use crate::error::{StreamError, StreamResult};

/// A protocol-neutral WebSocket frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// UTF-8 text payload
    Text(String),
    /// Binary payload
    Binary(Vec<u8>),
    /// Ping control frame
    Ping(Vec<u8>),
    /// Pong control frame
    Pong(Vec<u8>),
    /// Close control frame with an optional reason
    Close(Option<String>),
}

impl Frame {
    /// Create a text frame
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// Outbound half of a connection
pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = StreamError> + Send>>;

/// Inbound half of a connection
pub type FrameStream = Pin<Box<dyn Stream<Item = StreamResult<Frame>> + Send>>;

/// An open connection
pub struct Connection {
    /// Frames written here are sent to the peer
    pub sink: FrameSink,
    /// Frames received from the peer; the connection is closed when it ends
    pub stream: FrameStream,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

impl Connection {
    /// Assemble a connection from its halves
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

/// Opens connections to an endpoint
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a connection to `url`.
    async fn connect(&self, url: &Url) -> StreamResult<Connection>;
}

/// [`Connector`] over `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    /// Create a WebSocket connector
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &Url) -> StreamResult<Connection> {
        info!("Connecting to WebSocket server at {}", url);

        let (stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
            StreamError::ConnectionFailed(format!("WebSocket connection failed: {e}"))
        })?;
        let (writer, reader) = stream.split();

        let sink = writer
            .sink_map_err(|e| StreamError::SendFailed(e.to_string()))
            .with(|frame: Frame| future::ready(Ok::<_, StreamError>(frame_to_message(frame))));

        let stream = reader.filter_map(|message| {
            future::ready(match message {
                Ok(message) => message_to_frame(message).map(Ok),
                Err(e) => Some(Err(StreamError::from(e))),
            })
        });

        debug!("WebSocket connection to {} established", url);
        Ok(Connection::new(Box::pin(sink), Box::pin(stream)))
    }
}

fn frame_to_message(frame: Frame) -> Message {
    match frame {
        Frame::Text(text) => Message::text(text),
        Frame::Binary(data) => Message::binary(data),
        Frame::Ping(data) => Message::Ping(data.into()),
        Frame::Pong(data) => Message::Pong(data.into()),
        Frame::Close(_) => Message::Close(None),
    }
}

fn message_to_frame(message: Message) -> Option<Frame> {
    match message {
        Message::Text(text) => Some(Frame::Text(text.as_str().to_owned())),
        Message::Binary(data) => Some(Frame::Binary(data.to_vec())),
        Message::Ping(data) => Some(Frame::Ping(data.to_vec())),
        Message::Pong(data) => Some(Frame::Pong(data.to_vec())),
        Message::Close(frame) => Some(Frame::Close(
            frame.map(|close| close.reason.as_str().to_owned()),
        )),
        // Raw frames only appear when reading with a custom configuration
        Message::Frame(_) => None,
    }
}
