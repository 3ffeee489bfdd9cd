//! # Resilink Telemetry
//!
//! Structured logging setup for applications built on the resilink crates.
//! The library crates only emit `tracing` events; binaries call
//! [`TelemetryConfig::init`] once to route them to stdout or stderr as
//! JSON lines or compact text.
//!
//! ```rust,no_run
//! use resilink_telemetry::TelemetryConfig;
//!
//! # fn main() -> resilink_telemetry::TelemetryResult<()> {
//! let _telemetry = TelemetryConfig::builder()
//!     .service_name("order-dashboard")
//!     .json_logs(true)
//!     .build()
//!     .init()?;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod error;
pub mod init;

pub use config::{DEFAULT_LOG_LEVEL, TelemetryConfig, TelemetryConfigBuilder};
pub use error::{TelemetryError, TelemetryResult};
pub use init::{TelemetryGuard, env_filter};
