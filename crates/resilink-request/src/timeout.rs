//! Timeout decorator
//!
//! The underlying call runs as its own task. If it has not settled when the
//! timer fires the caller receives [`RequestError::Timeout`] and the task is
//! detached: it keeps running to completion and its outcome is discarded.
//! Callers needing the work stopped should combine the timeout with a
//! [`CancelToken`](crate::CancelToken).

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::warn;

use crate::error::{RequestError, RequestResult};
use crate::request::Request;

/// Default timeout applied by [`Timeout::default_for`]
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Race `future` against a timer of `timeout`.
///
/// The future is spawned, so it must be `'static`; on timeout it is left
/// running in the background.
pub async fn with_timeout<F, T>(future: F, timeout: Duration) -> RequestResult<T>
where
    F: Future<Output = RequestResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::spawn(future);

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(RequestError::Internal(format!(
            "request task failed: {join_error}"
        ))),
        Err(_) => {
            warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Request timed out; underlying call left running"
            );
            Err(RequestError::Timeout { timeout })
        }
    }
}

/// A request whose calls fail with [`RequestError::Timeout`] after a deadline
pub struct Timeout<R> {
    inner: Arc<R>,
    timeout: Duration,
}

impl<R> Clone for Timeout<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: self.timeout,
        }
    }
}

impl<R> fmt::Debug for Timeout<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeout")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<R> Timeout<R> {
    /// Wrap `inner` with the given deadline
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            timeout,
        }
    }

    /// Wrap `inner` with [`DEFAULT_TIMEOUT`]
    pub fn default_for(inner: R) -> Self {
        Self::new(inner, DEFAULT_TIMEOUT)
    }

    /// The configured deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl<A, R: Request<A>> Request<A> for Timeout<R> {
    type Response = R::Response;

    fn call(&self, args: A) -> BoxFuture<'static, RequestResult<R::Response>> {
        with_timeout(self.inner.call(args), self.timeout).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_settles_before_deadline() {
        let result = with_timeout(async { Ok(5u8) }, Duration::from_millis(100)).await;
        assert_eq!(result, Ok(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_error_and_detached_completion() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let result = with_timeout(
            async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                flag.store(true, Ordering::SeqCst);
                Ok(())
            },
            Duration::from_millis(100),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "Request timeout after 100ms");
        assert!(err.is_timeout());

        // The abandoned call keeps running to completion
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_underlying_error_passes_through() {
        let result = with_timeout(
            async { Err::<(), _>(RequestError::failed("bad")) },
            DEFAULT_TIMEOUT,
        )
        .await;
        assert_eq!(result, Err(RequestError::failed("bad")));
    }
}
