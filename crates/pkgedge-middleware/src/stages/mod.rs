//! Pipeline stage implementations.
//!
//! Package stages (in [`Pipeline::package`](crate::Pipeline::package) order):
//!
//! - [`ResolveStage`] - path to package reference
//! - [`FilterStage`] - blacklist policy
//! - [`FetchStage`] - content retrieval
//! - [`EmitStage`] - response construction
//!
//! Admission stages (run for every request, before routing):
//!
//! - [`AccessLogMiddleware`] - one access log line per request
//! - [`RequestIdMiddleware`] - request correlation id
//! - [`CorsMiddleware`] - cross-origin headers and preflight

pub mod access_log;
pub mod cors;
pub mod emit;
pub mod fetch;
pub mod filter;
pub mod request_id;
pub mod resolve;

pub use access_log::AccessLogMiddleware;
pub use cors::CorsMiddleware;
pub use emit::EmitStage;
pub use fetch::FetchStage;
pub use filter::FilterStage;
pub use request_id::RequestIdMiddleware;
pub use resolve::ResolveStage;
