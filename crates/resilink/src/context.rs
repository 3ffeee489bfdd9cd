//! Wiring of the resilink components behind one handle
//!
//! [`ClientContext`] owns the shared [`CacheStore`], the [`ErrorReporter`]
//! with its periodic flush task and, when a stream URL is configured, a
//! connected [`StreamClient`]. Components are injected rather than global so
//! tests and embedders can run several contexts side by side.

use std::sync::Arc;
use std::time::Duration;

use resilink_reporter::{ErrorReporter, ErrorStore, HttpReportSink, MemorySink, ReportSink};
use resilink_request::{CacheConfig, CacheStore, RetryConfig};
use resilink_stream::{Connector, StreamClient, WebSocketConnector};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::Result;

/// Running client components built from a [`ClientConfig`]
#[derive(Debug)]
pub struct ClientContext {
    config: ClientConfig,
    cache: Arc<CacheStore>,
    reporter: ErrorReporter,
    stream: Option<StreamClient>,
    flusher: Option<JoinHandle<()>>,
}

impl ClientContext {
    /// Build every component and connect the stream.
    ///
    /// Records are posted to `reporter.base_url` when set and kept in memory
    /// otherwise.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start(config: ClientConfig) -> Result<Self> {
        let sink: Arc<dyn ReportSink> = match &config.reporter.base_url {
            Some(base_url) => Arc::new(HttpReportSink::new(base_url)?),
            None => Arc::new(MemorySink::new()),
        };
        Self::start_with(config, Arc::new(WebSocketConnector::new()), sink)
    }

    /// Build every component with an explicit connector and report sink.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn start_with(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
        sink: Arc<dyn ReportSink>,
    ) -> Result<Self> {
        config.validate()?;

        let cache = Arc::new(CacheStore::new());
        let store = Arc::new(ErrorStore::new(config.reporter.capacity));
        let reporter = ErrorReporter::with_store(store, sink);

        let stream = match config.stream.to_stream_config() {
            Some(stream_config) => {
                let client = StreamClient::with_shared_connector(stream_config, connector)?;
                client.connect();
                Some(client)
            }
            None => {
                debug!("No stream URL configured; streaming disabled");
                None
            }
        };

        let flusher = config
            .reporter
            .flush_interval()
            .map(|interval| reporter.spawn_periodic_flush(interval));

        info!(
            stream = stream.as_ref().map(|client| client.url().as_str()),
            flush_interval_secs = config.reporter.flush_interval_secs,
            "Client context started"
        );

        Ok(Self {
            config,
            cache,
            reporter,
            stream,
            flusher,
        })
    }

    /// Configuration the context was started with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Cache shared by requests built through this context
    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    /// Error reporter
    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// Stream client, when a URL was configured
    pub fn stream(&self) -> Option<&StreamClient> {
        self.stream.as_ref()
    }

    /// Cache configuration bound to this context's store and max age
    pub fn cache_config<A>(&self) -> CacheConfig<A> {
        CacheConfig::new()
            .with_store(Arc::clone(&self.cache))
            .with_max_age(self.config.request.cache_max_age())
    }

    /// Configured retry policy
    pub fn retry_config(&self) -> RetryConfig {
        self.config.request.retry_config()
    }

    /// Configured per-attempt timeout
    pub fn timeout(&self) -> Duration {
        self.config.request.timeout()
    }

    /// Disconnect the stream, flush pending errors and clear the cache.
    ///
    /// Returns the number of error records delivered by the final flush.
    pub async fn shutdown(mut self) -> usize {
        self.stop_background();

        let flushed = self.reporter.flush().await;
        self.cache.clear_cache(None);

        info!(flushed, "Client context shut down");
        flushed
    }

    fn stop_background(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.disconnect();
        }
        if let Some(flusher) = self.flusher.take() {
            flusher.abort();
        }
    }
}

/// Dropping a context without [`shutdown`](ClientContext::shutdown) still
/// closes the stream and stops the flush task; pending records are not sent.
impl Drop for ClientContext {
    fn drop(&mut self) {
        self.stop_background();
    }
}
