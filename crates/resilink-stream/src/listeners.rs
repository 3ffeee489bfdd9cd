//! Listener registries with explicit registration handles
//!
//! Registering the same `Arc` twice returns the handle of the existing
//! registration. Listeners are invoked in registration order against a
//! snapshot, so a listener may register or remove listeners (or call back
//! into the client) without deadlocking. A panicking listener is logged and
//! skipped; the remaining listeners still run.

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde_json::Value;
use tracing::error;

use crate::error::StreamError;

/// Callback receiving parsed inbound messages
pub type MessageListener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Callback receiving `true` on open and `false` on close
pub type ConnectionListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Callback receiving connection and reconnect errors
pub type ErrorListener = Arc<dyn Fn(&StreamError) + Send + Sync>;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle identifying one registration, unique across all registries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// An ordered, identity-deduplicated set of listeners
pub struct ListenerSet<F: ?Sized> {
    kind: &'static str,
    entries: RwLock<Vec<(ListenerId, Arc<F>)>>,
}

impl<F: ?Sized> fmt::Debug for ListenerSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}

impl<F: ?Sized> ListenerSet<F> {
    /// Create an empty set; `kind` labels log output
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Register `listener`, or return the handle it is already registered under.
    pub fn add(&self, listener: Arc<F>) -> ListenerId {
        let mut entries = self.entries.write();
        if let Some((id, _)) = entries
            .iter()
            .find(|(_, existing)| Arc::ptr_eq(existing, &listener))
        {
            return *id;
        }

        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        entries.push((id, listener));
        id
    }

    /// Remove a registration by handle. Returns whether it existed.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        entries.len() != before
    }

    /// Remove a registration by callback identity. Returns whether it existed.
    pub fn remove_listener(&self, listener: &Arc<F>) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|(_, existing)| !Arc::ptr_eq(existing, listener));
        entries.len() != before
    }

    /// Whether `listener` is registered
    pub fn contains(&self, listener: &Arc<F>) -> bool {
        self.entries
            .read()
            .iter()
            .any(|(_, existing)| Arc::ptr_eq(existing, listener))
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if no listener is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove every registration
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Invoke `call` for each listener in registration order, isolating panics.
    pub fn notify(&self, call: impl Fn(&F)) {
        let snapshot: Vec<(ListenerId, Arc<F>)> = self.entries.read().clone();
        for (id, listener) in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| call(&listener))) {
                error!(
                    listener = %id,
                    kind = self.kind,
                    panic = panic_message(panic.as_ref()),
                    "Stream listener panicked"
                );
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// The three registries a stream client fans out to
#[derive(Debug)]
pub struct Listeners {
    /// Inbound message listeners
    pub messages: ListenerSet<dyn Fn(&Value) + Send + Sync>,
    /// Connection state listeners
    pub connection: ListenerSet<dyn Fn(bool) + Send + Sync>,
    /// Error listeners
    pub errors: ListenerSet<dyn Fn(&StreamError) + Send + Sync>,
}

impl Default for Listeners {
    fn default() -> Self {
        Self {
            messages: ListenerSet::new("message"),
            connection: ListenerSet::new("connection"),
            errors: ListenerSet::new("error"),
        }
    }
}

impl Listeners {
    pub(crate) fn emit_message(&self, message: &Value) {
        self.messages.notify(|listener| listener(message));
    }

    pub(crate) fn emit_connection(&self, connected: bool) {
        self.connection.notify(|listener| listener(connected));
    }

    pub(crate) fn emit_error(&self, error: &StreamError) {
        self.errors.notify(|listener| listener(error));
    }
}
