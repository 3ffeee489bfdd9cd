//! Coalescing debounce decorator
//!
//! The first call in a quiet period schedules one execution `wait` later.
//! Every call made before that execution settles receives the same pending
//! result instead of starting a new request or pushing the timer back. Once
//! the execution settles the slot clears and the next call starts a new
//! cycle, so at most one underlying call is in flight per instance.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{RequestError, RequestResult};
use crate::request::Request;

/// Default quiet period for [`debounce_request`]
pub const DEFAULT_DEBOUNCE_WAIT: Duration = Duration::from_millis(300);

type PendingCall<T> = Shared<BoxFuture<'static, RequestResult<T>>>;

/// A request whose calls are coalesced into one scheduled invocation
pub struct Debounced<A, R: Request<A>> {
    inner: Arc<R>,
    wait: Duration,
    pending: Arc<Mutex<Option<PendingCall<R::Response>>>>,
    _args: PhantomData<fn(A)>,
}

impl<A, R: Request<A>> Clone for Debounced<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            wait: self.wait,
            pending: Arc::clone(&self.pending),
            _args: PhantomData,
        }
    }
}

impl<A, R: Request<A>> fmt::Debug for Debounced<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Debounced")
            .field("wait", &self.wait)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

impl<A, R> Debounced<A, R>
where
    A: Send + 'static,
    R: Request<A>,
    R::Response: Clone + Sync,
{
    /// Wrap `inner`, coalescing calls within `wait`
    pub fn new(inner: R, wait: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            wait,
            pending: Arc::new(Mutex::new(None)),
            _args: PhantomData,
        }
    }
}

impl<A, R: Request<A>> Debounced<A, R> {
    /// Whether a scheduled or in-flight execution is outstanding
    pub fn is_pending(&self) -> bool {
        self.pending.lock().is_some()
    }

    /// The configured quiet period
    pub fn wait(&self) -> Duration {
        self.wait
    }
}

impl<A, R> Request<A> for Debounced<A, R>
where
    A: Send + 'static,
    R: Request<A>,
    R::Response: Clone + Sync,
{
    type Response = R::Response;

    /// Arguments of coalesced calls are discarded; the execution runs with
    /// the arguments of the call that opened the cycle.
    fn call(&self, args: A) -> BoxFuture<'static, RequestResult<R::Response>> {
        let mut slot = self.pending.lock();
        if let Some(pending) = slot.as_ref() {
            trace!("Coalescing call into pending debounced request");
            return pending.clone().boxed();
        }

        let inner = Arc::clone(&self.inner);
        let pending = Arc::clone(&self.pending);
        let wait = self.wait;

        // Spawned so the execution fires after `wait` whether or not any
        // caller is polling.
        let task = tokio::spawn(async move {
            // Clears the slot even if the request panics or the task is aborted
            let _clear = ClearPending(pending);
            tokio::time::sleep(wait).await;
            debug!(wait_ms = wait.as_millis() as u64, "Executing debounced request");
            inner.call(args).await
        });

        let shared = async move {
            task.await.unwrap_or_else(|e| {
                Err(RequestError::Internal(format!(
                    "debounced request task failed: {e}"
                )))
            })
        }
        .boxed()
        .shared();

        *slot = Some(shared.clone());
        shared.boxed()
    }
}

struct ClearPending<T>(Arc<Mutex<Option<PendingCall<T>>>>);

impl<T> Drop for ClearPending<T> {
    fn drop(&mut self) {
        self.0.lock().take();
    }
}

/// Wrap `request` in a coalescing debounce with the given quiet period.
pub fn debounce_request<A, R>(request: R, wait: Duration) -> Debounced<A, R>
where
    A: Send + 'static,
    R: Request<A>,
    R::Response: Clone + Sync,
{
    Debounced::new(request, wait)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::request_fn;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok, assert_pending};

    #[tokio::test(start_paused = true)]
    async fn test_slot_clears_after_execution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let debounced = debounce_request(
            request_fn(move |_: ()| {
                let counter = Arc::clone(&counter);
                async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }
            }),
            DEFAULT_DEBOUNCE_WAIT,
        );

        assert_eq!(debounced.call(()).await, Ok(1));
        assert!(!debounced.is_pending());

        // A new cycle starts once the previous execution settled
        assert_eq!(debounced.call(()).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_shared_and_clear_the_slot() {
        let debounced = debounce_request(
            request_fn(|_: ()| async { Err::<u8, _>(RequestError::failed("down")) }),
            Duration::from_millis(50),
        );

        let first = debounced.call(());
        let second = debounced.call(());
        let (a, b) = tokio::join!(first, second);

        assert_eq!(a, Err(RequestError::failed("down")));
        assert_eq!(a, b);
        assert!(!debounced.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_request_clears_the_slot() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let debounced = debounce_request(
            request_fn(move |_: ()| {
                let call = counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if call == 0 {
                        panic!("request blew up");
                    }
                    Ok(call)
                }
            }),
            Duration::from_millis(50),
        );

        let error = assert_err!(debounced.call(()).await);
        assert!(matches!(error, RequestError::Internal(_)), "got {error:?}");
        assert!(!debounced.is_pending());

        assert_eq!(assert_ok!(debounced.call(()).await), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_coalesced_call_is_pending_until_wait_elapses() {
        let debounced = debounce_request(
            request_fn(|_: ()| async { Ok::<_, RequestError>(7) }),
            Duration::from_millis(100),
        );

        let mut first = tokio_test::task::spawn(debounced.call(()));
        let mut second = tokio_test::task::spawn(debounced.call(()));
        assert_pending!(first.poll());
        assert_pending!(second.poll());

        assert_eq!(first.await, Ok(7));
        assert_eq!(second.await, Ok(7));
    }
}
