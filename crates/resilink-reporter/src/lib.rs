//! # Resilink Reporter
//!
//! Client-side error capture. Failures are classified into an
//! [`ErrorKind`], buffered in a bounded [`ErrorStore`] and shipped to a
//! collector in batches, either on demand or on a fixed interval.
//!
//! ```rust,no_run
//! use resilink_reporter::{DEFAULT_FLUSH_INTERVAL, ErrorReporter, HttpReportSink};
//! use resilink_request::RequestError;
//!
//! # async fn example() -> resilink_reporter::ReportResult<()> {
//! let reporter = ErrorReporter::new(HttpReportSink::new("https://api.example.com")?);
//! reporter.install_panic_hook();
//! let _flusher = reporter.spawn_periodic_flush(DEFAULT_FLUSH_INTERVAL);
//!
//! let failure = RequestError::Connection("connection refused".into());
//! reporter.handle_request_error(&failure, serde_json::Map::new());
//! reporter.flush().await;
//! # Ok(())
//! # }
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
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod error;
pub mod record;
pub mod reporter;
pub mod sink;
pub mod store;

pub use error::{ReportError, ReportResult};
pub use record::{ErrorKind, ErrorRecord};
pub use reporter::{DEFAULT_FLUSH_INTERVAL, ErrorReporter};
pub use sink::{BATCH_REPORT_PATH, HttpReportSink, MemorySink, REPORT_PATH, ReportSink};
pub use store::{DEFAULT_STORE_CAPACITY, ErrorStore, PendingBatch, StoreStats};
