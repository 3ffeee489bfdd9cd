//! Delivery of error records to a collector

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::error::{ReportError, ReportResult};
use crate::record::ErrorRecord;

/// Collector path for single records, relative to the base URL
pub const REPORT_PATH: &str = "api/system/errors/";

/// Collector path for batches, relative to the base URL
pub const BATCH_REPORT_PATH: &str = "api/system/errors/batch/";

/// Destination for error records
#[async_trait]
pub trait ReportSink: Send + Sync + 'static {
    /// Deliver one record.
    async fn send(&self, record: &ErrorRecord) -> ReportResult<()>;

    /// Deliver records as one batch. Either all are accepted or none.
    async fn send_batch(&self, records: &[ErrorRecord]) -> ReportResult<()>;
}

/// [`ReportSink`] posting JSON to an HTTP collector
///
/// Single records are posted as-is to `<base>/api/system/errors/`; batches
/// are posted as `{"errors": [...]}` to `<base>/api/system/errors/batch/`.
#[derive(Clone)]
pub struct HttpReportSink {
    client: reqwest::Client,
    report_url: Url,
    batch_url: Url,
}

impl fmt::Debug for HttpReportSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpReportSink")
            .field("report_url", &self.report_url.as_str())
            .field("batch_url", &self.batch_url.as_str())
            .field("client", &"<reqwest::Client>")
            .finish()
    }
}

impl HttpReportSink {
    /// Default per-request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a sink for the collector at `base_url`
    pub fn new(base_url: &str) -> ReportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ReportError::Delivery(format!("HTTP client setup failed: {e}")))?;
        Self::with_client(base_url, client)
    }

    /// Create a sink sharing an existing HTTP client
    pub fn with_client(base_url: &str, client: reqwest::Client) -> ReportResult<Self> {
        let mut base = Url::parse(base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ReportError::InvalidUrl(format!(
                "unsupported scheme '{}' in {base_url}, expected http or https",
                base.scheme()
            )));
        }
        // Relative joins replace the last segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client,
            report_url: base.join(REPORT_PATH)?,
            batch_url: base.join(BATCH_REPORT_PATH)?,
        })
    }

    /// Endpoint for single records
    pub fn report_url(&self) -> &Url {
        &self.report_url
    }

    /// Endpoint for batches
    pub fn batch_url(&self) -> &Url {
        &self.batch_url
    }
}

#[async_trait]
impl ReportSink for HttpReportSink {
    async fn send(&self, record: &ErrorRecord) -> ReportResult<()> {
        debug!(url = %self.report_url, kind = %record.kind, "Posting error record");
        self.client
            .post(self.report_url.clone())
            .json(record)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn send_batch(&self, records: &[ErrorRecord]) -> ReportResult<()> {
        debug!(url = %self.batch_url, count = records.len(), "Posting error batch");
        self.client
            .post(self.batch_url.clone())
            .json(&json!({ "errors": records }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// [`ReportSink`] keeping delivered records in memory
///
/// Clones share state. [`fail_with`](Self::fail_with) makes every delivery
/// fail until cleared.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<MemorySinkState>>,
}

#[derive(Debug, Default)]
struct MemorySinkState {
    single: Vec<ErrorRecord>,
    batches: Vec<Vec<ErrorRecord>>,
    failure: Option<ReportError>,
}

impl MemorySink {
    /// Create an accepting sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every delivery with `error`, or accept again with `None`
    pub fn fail_with(&self, error: Option<ReportError>) {
        self.inner.lock().failure = error;
    }

    /// Records delivered one at a time
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.inner.lock().single.clone()
    }

    /// Batches delivered, in order
    pub fn batches(&self) -> Vec<Vec<ErrorRecord>> {
        self.inner.lock().batches.clone()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn send(&self, record: &ErrorRecord) -> ReportResult<()> {
        let mut state = self.inner.lock();
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        state.single.push(record.clone());
        Ok(())
    }

    async fn send_batch(&self, records: &[ErrorRecord]) -> ReportResult<()> {
        let mut state = self.inner.lock();
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        state.batches.push(records.to_vec());
        Ok(())
    }
}
