//! Error capture and delivery
//!
//! [`ErrorReporter`] records errors into an [`ErrorStore`] and delivers them
//! through a [`ReportSink`], one at a time with [`report`](ErrorReporter::report)
//! or in batches with [`flush`](ErrorReporter::flush). Delivery failures are
//! logged and leave the store untouched; they never reach the caller.

use std::panic::{self, PanicHookInfo};
use std::sync::Arc;
use std::time::Duration;

use resilink_request::RequestError;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::ReportError;
use crate::record::{ErrorKind, ErrorRecord};
use crate::sink::ReportSink;
use crate::store::ErrorStore;

/// Default interval between periodic flushes
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// Captures errors and ships them to a collector
#[derive(Clone)]
pub struct ErrorReporter {
    store: Arc<ErrorStore>,
    sink: Arc<dyn ReportSink>,
}

impl std::fmt::Debug for ErrorReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorReporter")
            .field("store", &self.store.stats())
            .finish_non_exhaustive()
    }
}

impl ErrorReporter {
    /// Create a reporter with a fresh default-capacity store
    pub fn new(sink: impl ReportSink) -> Self {
        Self::with_store(Arc::new(ErrorStore::default()), Arc::new(sink))
    }

    /// Create a reporter over an existing store and sink
    pub fn with_store(store: Arc<ErrorStore>, sink: Arc<dyn ReportSink>) -> Self {
        Self { store, sink }
    }

    /// The backing store
    pub fn store(&self) -> &Arc<ErrorStore> {
        &self.store
    }

    /// Record an error and return the stored record.
    pub fn log_error(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        context: Map<String, Value>,
    ) -> ErrorRecord {
        self.record(ErrorRecord::new(kind, message).with_context_map(context))
    }

    /// Record a prepared record and return it.
    pub fn record(&self, record: ErrorRecord) -> ErrorRecord {
        error!(
            kind = %record.kind,
            message = %record.message,
            code = ?record.code,
            status = ?record.status,
            endpoint = ?record.endpoint,
            "Error captured"
        );
        self.store.push(record.clone());
        record
    }

    /// Classify and record a failed request.
    ///
    /// Cancellations are intentional and return `None` without recording.
    pub fn handle_request_error(
        &self,
        error: &RequestError,
        context: Map<String, Value>,
    ) -> Option<ErrorRecord> {
        if error.is_cancelled() {
            debug!(%error, "Not recording cancelled request");
            return None;
        }
        ErrorRecord::from_request_error(error, context).map(|record| self.record(record))
    }

    /// Deliver a single record immediately, bypassing the store.
    ///
    /// Returns `false` when the collector could not take it.
    pub async fn report(&self, record: &ErrorRecord) -> bool {
        match self.sink.send(record).await {
            Ok(()) => true,
            Err(error) => {
                log_delivery_failure(&error, 1);
                false
            }
        }
    }

    /// Deliver everything pending as one batch.
    ///
    /// Returns the number of records delivered. The store is drained only
    /// when the collector accepts the batch; on a delivery failure it is kept
    /// intact and `0` is returned. An empty store is a no-op.
    pub async fn flush(&self) -> usize {
        let Some(batch) = self.store.pending() else {
            return 0;
        };

        match self.sink.send_batch(&batch.records).await {
            Ok(()) => {
                let delivered = self.store.acknowledge(batch.last_sequence);
                info!(delivered, "Flushed error records");
                delivered
            }
            Err(error) => {
                log_delivery_failure(&error, batch.records.len());
                0
            }
        }
    }

    /// Flush every `interval` while records are pending.
    ///
    /// The first flush happens one interval after the call. Abort the
    /// returned handle to stop.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime or with a zero interval.
    pub fn spawn_periodic_flush(&self, interval: Duration) -> JoinHandle<()> {
        let reporter = self.clone();
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if reporter.store.is_empty() {
                    continue;
                }
                reporter.flush().await;
            }
        })
    }

    /// Record panics as [`ErrorKind::Runtime`] errors.
    ///
    /// The previously installed hook still runs afterwards. Records are only
    /// stored; delivery happens on the next flush.
    pub fn install_panic_hook(&self) {
        let store = Arc::clone(&self.store);
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            store.push(panic_record(info));
            previous(info);
        }));
    }
}

fn log_delivery_failure(error: &ReportError, pending: usize) {
    if error.is_retryable() {
        warn!(%error, pending, "Error reporting failed");
    } else {
        // Retrying cannot fix these; they stay stored until cleared
        error!(%error, pending, "Error reporting rejected");
    }
}

fn panic_record(info: &PanicHookInfo<'_>) -> ErrorRecord {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with non-string payload".to_owned());

    let mut record = ErrorRecord::new(ErrorKind::Runtime, message).with_context("panic", true);
    if let Some(location) = info.location() {
        record = record
            .with_context("file", location.file())
            .with_context("line", location.line())
            .with_context("column", location.column());
    }
    if let Some(name) = std::thread::current().name() {
        record = record.with_context("thread", name);
    }
    record
}
