//! # pkgedge Test
//!
//! In-memory HTTP helpers for testing pkgedge handlers without binding a
//! port. Requests are built with [`TestRequest`], sent through a
//! [`TestClient`], and checked with the assertion helpers on
//! [`TestResponse`].
//!
//! ## Example
//!
//! ```
//! use pkgedge_core::fixtures::{FakeEmitter, FakeFetcher, FakeFilter, FakeResolver};
//! use pkgedge_middleware::Pipeline;
//! use pkgedge_test::TestClient;
//!
//! # tokio_test::block_on(async {
//! let client = TestClient::pipeline(Pipeline::package(
//!     FakeResolver::new(),
//!     FakeFilter::deny(["evil-pkg"]),
//!     FakeFetcher::echo(),
//!     FakeEmitter::new(),
//! ));
//!
//! client
//!     .get("/evil-pkg@1.0.0/index.js")
//!     .send()
//!     .await
//!     .assert_status_code(403)
//!     .assert_body("Package \"evil-pkg\" is blacklisted");
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/pkgedge-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
