//! # Resilink
//!
//! Building blocks for API clients that must stay responsive on unreliable
//! networks:
//!
//! - [`request`]: retry, debounce, throttle, cache, batch, timeout and
//!   cancellation decorators for async request functions
//! - [`stream`]: a reconnecting JSON-over-WebSocket client with
//!   exponential backoff
//! - [`reporter`]: bounded error capture with batched delivery
//! - [`telemetry`]: `tracing` subscriber setup
//!
//! [`ClientConfig`] loads settings for all of them and [`ClientContext`]
//! wires them together:
//!
//! ```rust,no_run
//! use resilink::{ClientConfig, ClientContext};
//! use resilink::request::{RequestExt, request_fn};
//!
//! # async fn example() -> resilink::Result<()> {
//! let config = ClientConfig::from_file("resilink.toml")?;
//! let context = ClientContext::start(config)?;
//!
//! let health = request_fn(|_: ()| async { Ok("ok".to_string()) })
//!     .with_timeout(context.timeout())
//!     .with_retry(context.retry_config())
//!     .with_cache(context.cache_config());
//! # let _ = health;
//!
//! context.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `http` - `From<reqwest::Error>` for [`RequestError`](request::RequestError)

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
    clippy::must_use_candidate
)]

pub mod config;
pub mod context;
pub mod error;

pub use resilink_reporter as reporter;
pub use resilink_request as request;
pub use resilink_stream as stream;
pub use resilink_telemetry as telemetry;

pub use config::{
    ClientConfig, ENV_PREFIX, ReconnectSection, ReporterSection, RequestSection, StreamSection,
    TelemetrySection,
};
pub use context::ClientContext;
pub use error::{ConfigError, Error, Result};
