//! The [`Request`] abstraction every decorator wraps and implements.
//!
//! A request is an asynchronous function from arguments `A` to
//! `RequestResult<Response>`. Decorators take a request and return another
//! request with the same argument and response types, so they stack freely:
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use resilink_request::{Request, RequestExt, RetryConfig, request_fn};
//!
//! # async fn example() -> resilink_request::RequestResult<()> {
//! let fetch = request_fn(|id: u64| async move { Ok(format!("customer-{id}")) })
//!     .with_retry(RetryConfig::default())
//!     .with_timeout(Duration::from_secs(5));
//!
//! let _name = fetch.call(42).await?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::Serialize;

use crate::cache::{CacheConfig, Cached};
use crate::cancel::{CancelToken, Cancellable};
use crate::debounce::Debounced;
use crate::error::RequestResult;
use crate::retry::{Retry, RetryConfig};
use crate::throttle::Throttled;
use crate::timeout::Timeout;

/// An asynchronous request function.
///
/// Implementations return `'static` futures so decorators can spawn, share
/// and race them freely.
pub trait Request<A>: Send + Sync + 'static {
    /// Successful response type
    type Response: Send + 'static;

    /// Invoke the request with the given arguments.
    fn call(&self, args: A) -> BoxFuture<'static, RequestResult<Self::Response>>;
}

impl<A, R> Request<A> for Arc<R>
where
    R: Request<A> + ?Sized,
{
    type Response = R::Response;

    fn call(&self, args: A) -> BoxFuture<'static, RequestResult<Self::Response>> {
        (**self).call(args)
    }
}

/// Adapter turning a closure returning a future into a [`Request`].
#[derive(Clone)]
pub struct RequestFn<F> {
    f: F,
}

impl<F> fmt::Debug for RequestFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestFn")
            .field("f", &std::any::type_name::<F>())
            .finish()
    }
}

/// Wrap a closure as a [`Request`].
pub fn request_fn<F>(f: F) -> RequestFn<F> {
    RequestFn { f }
}

impl<A, T, F, Fut> Request<A> for RequestFn<F>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RequestResult<T>> + Send + 'static,
    T: Send + 'static,
{
    type Response = T;

    fn call(&self, args: A) -> BoxFuture<'static, RequestResult<T>> {
        (self.f)(args).boxed()
    }
}

/// A type-erased request, handy for storing heterogeneous decorator stacks.
pub type BoxRequest<A, T> = Arc<dyn Request<A, Response = T>>;

/// Decorator combinators available on every [`Request`].
pub trait RequestExt<A>: Request<A> + Sized {
    /// Retry failed calls according to `config`.
    fn with_retry(self, config: RetryConfig) -> Retry<Self> {
        Retry::new(self, config)
    }

    /// Coalesce calls made within `wait` into one underlying invocation.
    fn debounce(self, wait: Duration) -> Debounced<A, Self>
    where
        A: Send + 'static,
        Self::Response: Clone + Sync,
    {
        Debounced::new(self, wait)
    }

    /// Invoke the request at most once per `limit` window.
    fn throttle(self, limit: Duration) -> Throttled<A, Self>
    where
        Self::Response: Clone + Sync,
    {
        Throttled::new(self, limit)
    }

    /// Memoize responses in a [`CacheStore`](crate::CacheStore).
    fn with_cache(self, config: CacheConfig<A>) -> Cached<A, Self>
    where
        A: Serialize,
        Self::Response: Clone + Sync,
    {
        Cached::new(self, config)
    }

    /// Fail calls that do not settle within `timeout`.
    fn with_timeout(self, timeout: Duration) -> Timeout<Self> {
        Timeout::new(self, timeout)
    }

    /// Abort calls once `token` is cancelled.
    fn with_cancel(self, token: CancelToken) -> Cancellable<Self> {
        Cancellable::new(self, token)
    }

    /// Erase the concrete decorator stack.
    fn boxed_request(self) -> BoxRequest<A, Self::Response> {
        Arc::new(self)
    }
}

impl<A, R: Request<A>> RequestExt<A> for R {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;

    #[tokio::test]
    async fn test_request_fn_forwards_arguments() {
        let double = request_fn(|x: u32| async move { Ok(x * 2) });
        assert_eq!(double.call(21).await, Ok(42));
    }

    #[tokio::test]
    async fn test_boxed_request_is_callable() {
        let failing = request_fn(|_: ()| async { Err::<u8, _>(RequestError::failed("nope")) })
            .boxed_request();
        assert_eq!(failing.call(()).await, Err(RequestError::failed("nope")));
    }
}
