//! Throttle decorator
//!
//! The first call executes immediately and opens a window of `limit`. Calls
//! inside the window never invoke the underlying request: while the
//! window-opening call is still in flight they share its outcome, afterwards
//! they receive the last successful result, however stale. The first call
//! after the window closes executes fresh and reopens it.
//!
//! `Ok(None)` is returned when the window is open, nothing is in flight and
//! no call has ever succeeded (the window-opening call failed).

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::error::RequestResult;
use crate::request::Request;

/// Default window for [`throttle_request`]
pub const DEFAULT_THROTTLE_LIMIT: Duration = Duration::from_millis(1000);

type InFlight<T> = Shared<BoxFuture<'static, RequestResult<T>>>;

/// Throttle gate and the last successful result
struct ThrottleWindow<T> {
    /// Window end; the gate is open while `now < open_until`
    open_until: Option<Instant>,
    last_result: Option<T>,
    in_flight: Option<InFlight<T>>,
    /// Bumped each time a window opens
    generation: u64,
}

/// A request invoked at most once per window
pub struct Throttled<A, R: Request<A>> {
    inner: Arc<R>,
    limit: Duration,
    window: Arc<Mutex<ThrottleWindow<R::Response>>>,
    _args: PhantomData<fn(A)>,
}

impl<A, R: Request<A>> Clone for Throttled<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            limit: self.limit,
            window: Arc::clone(&self.window),
            _args: PhantomData,
        }
    }
}

impl<A, R: Request<A>> fmt::Debug for Throttled<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Throttled")
            .field("limit", &self.limit)
            .field("in_throttle", &self.in_throttle())
            .finish_non_exhaustive()
    }
}

impl<A, R> Throttled<A, R>
where
    R: Request<A>,
    R::Response: Clone + Sync,
{
    /// Wrap `inner`, allowing one invocation per `limit`
    pub fn new(inner: R, limit: Duration) -> Self {
        Self {
            inner: Arc::new(inner),
            limit,
            window: Arc::new(Mutex::new(ThrottleWindow {
                open_until: None,
                last_result: None,
                in_flight: None,
                generation: 0,
            })),
            _args: PhantomData,
        }
    }
}

impl<A, R: Request<A>> Throttled<A, R> {
    /// Whether the throttle window is currently open
    pub fn in_throttle(&self) -> bool {
        self.window
            .lock()
            .open_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// The configured window length
    pub fn limit(&self) -> Duration {
        self.limit
    }
}

impl<A, R> Request<A> for Throttled<A, R>
where
    A: 'static,
    R: Request<A>,
    R::Response: Clone + Sync,
{
    type Response = Option<R::Response>;

    fn call(&self, args: A) -> BoxFuture<'static, RequestResult<Option<R::Response>>> {
        let mut window = self.window.lock();
        let now = Instant::now();

        if window.open_until.is_some_and(|until| now < until) {
            if let Some(in_flight) = window.in_flight.as_ref() {
                trace!("Throttled call joins in-flight request");
                return in_flight.clone().map(|r| r.map(Some)).boxed();
            }
            trace!("Throttled call served from last result");
            let last = window.last_result.clone();
            return async move { Ok(last) }.boxed();
        }

        window.open_until = Some(now + self.limit);
        window.generation += 1;
        let generation = window.generation;

        let state = Arc::clone(&self.window);
        let call = self.inner.call(args);
        let shared = async move {
            let result = call.await;
            let mut window = state.lock();
            if window.generation == generation {
                window.in_flight = None;
            }
            if let Ok(value) = &result {
                window.last_result = Some(value.clone());
            }
            result
        }
        .boxed()
        .shared();

        window.in_flight = Some(shared.clone());
        shared.map(|r| r.map(Some)).boxed()
    }
}

/// Wrap `request` so it runs at most once per `limit`.
pub fn throttle_request<A, R>(request: R, limit: Duration) -> Throttled<A, R>
where
    R: Request<A>,
    R::Response: Clone + Sync,
{
    Throttled::new(request, limit)
}
