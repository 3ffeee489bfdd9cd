//! # Resilink Request
//!
//! Composable decorators for asynchronous request functions: retry,
//! debounce, throttle, caching, timeouts, cancellation and bounded batches.
//!
//! A request is anything implementing [`Request`]. Each decorator wraps a
//! request and is itself a request, so stacks are built by chaining
//! [`RequestExt`] combinators or by nesting the free functions:
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use resilink_request::{CacheConfig, Request, RequestExt, RetryConfig, request_fn};
//!
//! # async fn example() -> resilink_request::RequestResult<()> {
//! let customers = request_fn(|page: u32| async move { Ok(vec![page]) })
//!     .with_timeout(Duration::from_secs(10))
//!     .with_retry(RetryConfig::transient_only())
//!     .with_cache(CacheConfig::new().with_prefix("customers"));
//!
//! let first_page = customers.call(1).await?;
//! # let _ = first_page;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! ```text
//! resilink-request/
//! ├── request     # Request trait, closure adapter, combinators
//! ├── retry       # Fixed-delay retry
//! ├── debounce    # Coalescing debounce
//! ├── throttle    # Leading-edge throttle
//! ├── cache       # Memoization and the shared CacheStore
//! ├── batch       # Grouped batch execution
//! ├── timeout     # Deadline racing
//! ├── cancel      # Cooperative cancellation
//! ├── response    # {code, message, data, errors} envelope
//! └── mock        # Canned requests
//! ```
//!
//! ## Feature Flags
//!
//! - `http` - `From<reqwest::Error>` for [`RequestError`]

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
    clippy::cast_possible_truncation,  // Millisecond durations logged as u64
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod batch;
pub mod cache;
pub mod cancel;
pub mod debounce;
pub mod error;
pub mod mock;
pub mod request;
pub mod response;
pub mod retry;
pub mod throttle;
pub mod timeout;

pub use batch::{BatchConfig, DEFAULT_BATCH_CONCURRENCY, batch_requests};
pub use cache::{
    CacheConfig, CacheEntry, CacheKeyFn, CacheStats, CacheStore, Cached, DEFAULT_CACHE_MAX_AGE,
    clear_cache, with_cache,
};
pub use cancel::{
    CancelSource, CancelToken, Cancellable, create_cancel_token, is_request_cancelled,
    with_cancel,
};
pub use debounce::{DEFAULT_DEBOUNCE_WAIT, Debounced, debounce_request};
pub use error::{RequestError, RequestResult};
pub use mock::{DEFAULT_MOCK_DELAY, MOCK_FAILURE_MESSAGE, MockRequest, mock_request};
pub use request::{BoxRequest, Request, RequestExt, RequestFn, request_fn};
pub use response::{ApiResponse, SUCCESS_CODE};
pub use retry::{Retry, RetryConfig, RetryPredicate, with_retry};
pub use throttle::{DEFAULT_THROTTLE_LIMIT, Throttled, throttle_request};
pub use timeout::{DEFAULT_TIMEOUT, Timeout, with_timeout};
