//! Retry decorator with a fixed delay between attempts
//!
//! A failed call is retried while the attempt count has not reached
//! [`RetryConfig::retries`] and the configured predicate accepts the error.
//! The delay between attempts is constant; only the last error propagates.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{RequestError, RequestResult};
use crate::request::Request;

/// Predicate deciding whether an error is worth another attempt
pub type RetryPredicate = Arc<dyn Fn(&RequestError) -> bool + Send + Sync>;

/// Retry configuration for decorated requests
#[derive(Clone)]
pub struct RetryConfig {
    /// Number of retries after the first attempt (0 = exactly one attempt)
    pub retries: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
    /// Custom retry condition; `None` retries every error
    pub should_retry: Option<RetryPredicate>,
}

impl fmt::Debug for RetryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryConfig")
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("should_retry", &self.should_retry.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay: Duration::from_millis(1000),
            should_retry: None,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with defaults (3 retries, 1s apart)
    pub fn new() -> Self {
        Self::default()
    }

    /// A configuration that never retries
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    /// Retry only errors classified as transient by [`RequestError::is_transient`]
    pub fn transient_only() -> Self {
        Self::default().with_should_retry(RequestError::is_transient)
    }

    /// Set the number of retries
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the delay between attempts
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the retry predicate
    pub fn with_should_retry<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&RequestError) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    /// Check if a failure on the given 0-indexed attempt should be retried
    pub fn should_retry(&self, error: &RequestError, attempt: u32) -> bool {
        if attempt >= self.retries {
            return false;
        }

        match &self.should_retry {
            Some(predicate) => predicate(error),
            None => true,
        }
    }
}

/// A request retried on failure according to a [`RetryConfig`]
pub struct Retry<R> {
    inner: Arc<R>,
    config: RetryConfig,
}

impl<R> Clone for Retry<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
        }
    }
}

impl<R> fmt::Debug for Retry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<R> Retry<R> {
    /// Wrap `inner` with retry behaviour
    pub fn new(inner: R, config: RetryConfig) -> Self {
        Self {
            inner: Arc::new(inner),
            config,
        }
    }

    /// Get the retry configuration
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }
}

impl<A, R> Request<A> for Retry<R>
where
    A: Clone + Send + 'static,
    R: Request<A>,
{
    type Response = R::Response;

    fn call(&self, args: A) -> BoxFuture<'static, RequestResult<R::Response>> {
        let inner = Arc::clone(&self.inner);
        let config = self.config.clone();

        async move {
            let mut attempt = 0;
            loop {
                match inner.call(args.clone()).await {
                    Ok(value) => {
                        if attempt > 0 {
                            debug!(attempt, "Request succeeded after retry");
                        }
                        return Ok(value);
                    }
                    Err(error) => {
                        if !config.should_retry(&error, attempt) {
                            return Err(error);
                        }

                        attempt += 1;
                        warn!(
                            attempt,
                            retries = config.retries,
                            delay_ms = config.retry_delay.as_millis() as u64,
                            error = %error,
                            "Request failed, retrying"
                        );
                        sleep(config.retry_delay).await;
                    }
                }
            }
        }
        .boxed()
    }
}

/// Wrap `request` so failed calls are retried per `config`.
pub fn with_retry<A, R>(request: R, config: RetryConfig) -> Retry<R>
where
    R: Request<A>,
{
    Retry::new(request, config)
}
