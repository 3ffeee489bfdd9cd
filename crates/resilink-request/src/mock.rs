//! Canned requests for tests and offline development
//!
//! Mock requests take no arguments; wrap one in [`request_fn`](crate::request_fn)
//! to adapt it to an argument-taking call site.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{RequestError, RequestResult};
use crate::request::Request;
use crate::response::ApiResponse;

/// Default latency of a [`MockRequest`]
pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_millis(1000);

/// Message carried by a failing [`MockRequest`]
pub const MOCK_FAILURE_MESSAGE: &str = "Mock request failed";

/// A request that resolves to a fixed envelope after a delay
#[derive(Debug, Clone)]
pub struct MockRequest<T> {
    data: T,
    delay: Duration,
    should_fail: bool,
}

impl<T> MockRequest<T> {
    /// The configured latency
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl<T> Request<()> for MockRequest<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Response = ApiResponse<T>;

    fn call(&self, _args: ()) -> BoxFuture<'static, RequestResult<ApiResponse<T>>> {
        let data = self.data.clone();
        let delay = self.delay;
        let should_fail = self.should_fail;

        async move {
            tokio::time::sleep(delay).await;
            if should_fail {
                Err(RequestError::failed(MOCK_FAILURE_MESSAGE))
            } else {
                Ok(ApiResponse::success(data))
            }
        }
        .boxed()
    }
}

/// Build a request resolving to `ApiResponse::success(data)` after `delay`,
/// or failing with [`MOCK_FAILURE_MESSAGE`] when `should_fail`.
pub fn mock_request<T>(data: T, delay: Duration, should_fail: bool) -> MockRequest<T>
where
    T: Clone + Send + Sync + 'static,
{
    MockRequest {
        data,
        delay,
        should_fail,
    }
}
