//! # pkgedge Core
//!
//! Core types and collaborator contracts for the pkgedge edge server.
//!
//! This crate provides the vocabulary shared by every other pkgedge crate:
//!
//! - [`PackageReference`] - A resolved, immutable reference to a file inside a package
//! - [`PolicyDecision`] / [`Rejection`] - Accept/reject outcomes and terminal responses
//! - [`FetchResult`] - Bytes and metadata retrieved for an accepted reference
//! - [`StatsSnapshot`] - Opaque edge-network statistics payload
//! - [`RequestId`] - Request correlation identifier
//! - [`EdgeError`] - Failures that escape the expected rejection paths
//!
//! The [`contract`] module defines the collaborator traits the request
//! pipeline is composed from: [`Resolver`], [`PolicyFilter`],
//! [`ContentFetcher`], [`ResponseEmitter`] and [`StatsProvider`].

#![doc(html_root_url = "https://docs.rs/pkgedge-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod contract;
mod decision;
mod error;
mod fetch;
pub mod fixtures;
pub mod mime;
mod reference;
mod request_id;
mod stats;
pub mod types;

pub use contract::{
    BoxFuture, ContentFetcher, FetchOutcome, PolicyFilter, Resolution, Resolver, ResponseEmitter,
    StatsProvider,
};
pub use decision::{PolicyDecision, Rejection};
pub use error::{EdgeError, EdgeResult, StatsError};
pub use fetch::FetchResult;
pub use reference::{PackageReference, ReferenceFlags};
pub use request_id::RequestId;
pub use stats::StatsSnapshot;
pub use types::{Request, Response};
