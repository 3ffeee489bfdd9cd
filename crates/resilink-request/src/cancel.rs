//! Cooperative request cancellation
//!
//! A [`CancelSource`] owns the right to cancel; the [`CancelToken`]s it hands
//! out observe it. Cancelling resolves every call wrapped with the token to
//! [`RequestError::Cancelled`] carrying the reason, and drops the underlying
//! future.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{RequestError, RequestResult};
use crate::request::Request;

/// Observer side of a cancellation
#[derive(Clone)]
pub struct CancelToken {
    token: CancellationToken,
    reason: Arc<Mutex<Option<String>>>,
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

impl CancelToken {
    /// Whether the owning source has cancelled
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The cancellation reason, if one was given
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    /// Resolves once the owning source cancels
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    fn error(&self) -> RequestError {
        RequestError::Cancelled {
            reason: self.reason(),
        }
    }
}

/// Owner side of a cancellation
#[derive(Debug, Clone)]
pub struct CancelSource {
    token: CancelToken,
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSource {
    /// Create an uncancelled source
    pub fn new() -> Self {
        Self {
            token: CancelToken {
                token: CancellationToken::new(),
                reason: Arc::new(Mutex::new(None)),
            },
        }
    }

    /// A token observing this source
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Cancel every call observing this source. Only the first reason sticks.
    pub fn cancel(&self, reason: Option<&str>) {
        if self.token.is_cancelled() {
            return;
        }
        if let Some(reason) = reason {
            self.token.reason.lock().get_or_insert_with(|| reason.to_owned());
        }
        debug!(reason = ?reason, "Cancelling requests");
        self.token.token.cancel();
    }

    /// Whether [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Create a fresh cancellation source.
pub fn create_cancel_token() -> CancelSource {
    CancelSource::new()
}

/// Whether `error` came from a cancellation rather than a failure.
pub fn is_request_cancelled(error: &RequestError) -> bool {
    error.is_cancelled()
}

/// Race `future` against `token`, dropping the future on cancellation.
pub async fn with_cancel<F, T>(future: F, token: CancelToken) -> RequestResult<T>
where
    F: Future<Output = RequestResult<T>>,
{
    if token.is_cancelled() {
        return Err(token.error());
    }

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(token.error()),
        result = future => result,
    }
}

/// A request whose calls observe a [`CancelToken`]
pub struct Cancellable<R> {
    inner: Arc<R>,
    token: CancelToken,
}

impl<R> Clone for Cancellable<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            token: self.token.clone(),
        }
    }
}

impl<R> fmt::Debug for Cancellable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cancellable")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl<R> Cancellable<R> {
    /// Wrap `inner` so its calls abort once `token` is cancelled
    pub fn new(inner: R, token: CancelToken) -> Self {
        Self {
            inner: Arc::new(inner),
            token,
        }
    }
}

impl<A, R: Request<A>> Request<A> for Cancellable<R> {
    type Response = R::Response;

    fn call(&self, args: A) -> BoxFuture<'static, RequestResult<R::Response>> {
        if self.token.is_cancelled() {
            let err = self.token.error();
            return async move { Err(err) }.boxed();
        }
        with_cancel(self.inner.call(args), self.token.clone()).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_pending_call() {
        let source = create_cancel_token();
        let token = source.token();

        let call = tokio::spawn(with_cancel(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(1u8)
            },
            token,
        ));

        tokio::time::sleep(Duration::from_millis(10)).await;
        source.cancel(Some("user navigated away"));

        let err = call.await.unwrap().unwrap_err();
        assert!(is_request_cancelled(&err));
        assert_eq!(err.to_string(), "Request cancelled: user navigated away");
    }

    #[tokio::test]
    async fn test_already_cancelled_token_short_circuits() {
        let source = CancelSource::new();
        source.cancel(None);
        source.cancel(Some("ignored"));

        let result = with_cancel(async { Ok(()) }, source.token()).await;
        assert_eq!(result, Err(RequestError::Cancelled { reason: None }));
    }

    #[test]
    fn test_failures_are_not_cancellations() {
        assert!(!is_request_cancelled(&RequestError::failed("boom")));
    }
}
