//! # pkgedge Middleware
//!
//! The request pipeline of the pkgedge edge server.
//!
//! Every package request flows through four stages in a fixed order:
//!
//! ```text
//! Request → Resolve → Filter → Fetch → Emit → Response
//!              │         │        │       │
//!              └─────────┴────────┴───────┴──→ rejection (3xx/4xx) or failure
//!                                               │
//!                                  ErrorHandler ← (500, failures only)
//! ```
//!
//! | Stage | Collaborator | Adds to the context |
//! |-------|--------------|---------------------|
//! | 1 | [`Resolver`](pkgedge_core::Resolver) | package reference |
//! | 2 | [`PolicyFilter`](pkgedge_core::PolicyFilter) | nothing (accept / reject) |
//! | 3 | [`ContentFetcher`](pkgedge_core::ContentFetcher) | fetch result |
//! | 4 | [`ResponseEmitter`](pkgedge_core::ResponseEmitter) | the response |
//!
//! ## Rules
//!
//! - A stage either continues by calling [`Next::run`], or ends the request
//!   by sending a response into the [`RequestContext`].
//! - A stage failure is returned as an [`EdgeError`](pkgedge_core::EdgeError);
//!   the remaining stages never run and the [`ErrorHandler`] turns the
//!   failure into an opaque `500`.
//! - Context fields are set once. A stage can add to the context but never
//!   replace what an earlier stage put there.
//! - At most one response is sent per request.
//!
//! ## Admission stages
//!
//! Requests pass through process-wide stages before routing: access
//! logging, request id assignment and CORS ([`stages`]).
//!
//! ## Example
//!
//! ```
//! use pkgedge_middleware::pipeline::{Pipeline, Stage};
//! use pkgedge_core::fixtures::{FakeEmitter, FakeFetcher, FakeFilter, FakeResolver};
//!
//! let pipeline = Pipeline::package(
//!     FakeResolver::new(),
//!     FakeFilter::accept_all(),
//!     FakeFetcher::echo(),
//!     FakeEmitter::new(),
//! );
//! assert_eq!(pipeline.stage_names(), vec!["resolve", "filter", "fetch", "emit"]);
//! assert_eq!(Stage::all()[0].name(), "resolve");
//! ```

#![doc(html_root_url = "https://docs.rs/pkgedge-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod error_handler;
pub mod middleware;
pub mod pipeline;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use context::RequestContext;
pub use error_handler::{ErrorHandler, HandledError};
pub use middleware::{BoxFuture, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use types::{Request, Response, ResponseExt};
