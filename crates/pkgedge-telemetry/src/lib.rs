//! Logging for pkgedge.
//!
//! This crate covers the two log streams the edge server writes:
//!
//! - **Diagnostics**: `tracing` events, rendered by `tracing-subscriber`
//!   as pretty text in development or JSON in production ([`logging`]).
//! - **Access log**: exactly one line per request, in a format chosen by
//!   the deployment [`Environment`] ([`access`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use pkgedge_telemetry::{init_logging, Environment, LogConfig};
//!
//! let env = Environment::Production;
//! init_logging(&LogConfig::for_environment(env))?;
//! ```

#![doc(html_root_url = "https://docs.rs/pkgedge-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod access;
mod environment;
mod error;
pub mod logging;

pub use access::{AccessLogFormat, AccessRecord, ACCESS_LOG_TARGET};
pub use environment::Environment;
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
