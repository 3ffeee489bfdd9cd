//! In-memory [`Connector`] for tests and embedding
//!
//! Every successful connect hands the far end of the connection to the
//! owner of the [`MemoryConnector`] as a [`MemoryPeer`], which can push
//! frames to the client, read what the client sent, inject transport errors
//! and close the connection by being dropped.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::channel::mpsc as frame_channel;
use futures::{SinkExt as _, StreamExt as _};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::debug;
use url::Url;

use crate::connector::{Connection, Connector, Frame};
use crate::error::{StreamError, StreamResult};

/// Scripted connection outcomes plus a queue of accepted peers
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    inner: Arc<MemoryInner>,
}

#[derive(Debug)]
struct MemoryInner {
    attempts: AtomicUsize,
    /// Failure messages consumed one per connect attempt
    failures: Mutex<VecDeque<String>>,
    refuse_all: Mutex<Option<String>>,
    peers_tx: mpsc::UnboundedSender<MemoryPeer>,
    peers_rx: AsyncMutex<mpsc::UnboundedReceiver<MemoryPeer>>,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryConnector {
    /// Create a connector that accepts every connection
    pub fn new() -> Self {
        let (peers_tx, peers_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(MemoryInner {
                attempts: AtomicUsize::new(0),
                failures: Mutex::new(VecDeque::new()),
                refuse_all: Mutex::new(None),
                peers_tx,
                peers_rx: AsyncMutex::new(peers_rx),
            }),
        }
    }

    /// Fail the next `count` connect attempts with `message`
    pub fn fail_next(&self, count: usize, message: &str) {
        let mut failures = self.inner.failures.lock();
        failures.extend(std::iter::repeat_n(message.to_owned(), count));
    }

    /// Refuse every attempt until called again with `None`
    pub fn refuse_all(&self, message: Option<&str>) {
        *self.inner.refuse_all.lock() = message.map(str::to_owned);
    }

    /// Number of connect attempts seen so far
    pub fn attempts(&self) -> usize {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Wait for the next accepted connection
    pub async fn next_peer(&self) -> Option<MemoryPeer> {
        self.inner.peers_rx.lock().await.recv().await
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &Url) -> StreamResult<Connection> {
        self.inner.attempts.fetch_add(1, Ordering::SeqCst);

        let refusal = self.inner.refuse_all.lock().clone();
        if let Some(message) = refusal.or_else(|| self.inner.failures.lock().pop_front()) {
            debug!(%url, "Memory connector refusing connection");
            return Err(StreamError::ConnectionFailed(message));
        }

        let (to_peer, from_client) = frame_channel::unbounded();
        let (to_client, from_peer) = frame_channel::unbounded();

        let peer = MemoryPeer {
            url: url.clone(),
            to_client,
            from_client,
        };
        if self.inner.peers_tx.send(peer).is_err() {
            return Err(StreamError::ConnectionFailed(
                "memory connector dropped".to_string(),
            ));
        }

        let sink = to_peer.sink_map_err(|e| StreamError::SendFailed(e.to_string()));
        Ok(Connection::new(Box::pin(sink), Box::pin(from_peer)))
    }
}

/// The server side of an in-memory connection
#[derive(Debug)]
pub struct MemoryPeer {
    url: Url,
    to_client: frame_channel::UnboundedSender<StreamResult<Frame>>,
    from_client: frame_channel::UnboundedReceiver<Frame>,
}

impl MemoryPeer {
    /// URL the client connected to
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Push a text frame to the client. Returns `false` once the client
    /// side has gone away.
    pub fn send_text(&self, text: &str) -> bool {
        self.send_frame(Frame::text(text))
    }

    /// Push a JSON-serialized frame to the client
    pub fn send_json<T: Serialize>(&self, value: &T) -> bool {
        match serde_json::to_string(value) {
            Ok(text) => self.send_text(&text),
            Err(_) => false,
        }
    }

    /// Push an arbitrary frame to the client
    pub fn send_frame(&self, frame: Frame) -> bool {
        self.to_client.unbounded_send(Ok(frame)).is_ok()
    }

    /// Inject a transport error into the client's inbound stream
    pub fn send_error(&self, error: StreamError) -> bool {
        self.to_client.unbounded_send(Err(error)).is_ok()
    }

    /// Next frame written by the client, `None` once its sink is gone
    pub async fn recv(&mut self) -> Option<Frame> {
        self.from_client.next().await
    }

    /// Close the connection from the server side
    pub fn close(self) {
        self.to_client.close_channel();
    }
}
