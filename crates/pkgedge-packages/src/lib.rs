//! # pkgedge Packages
//!
//! Default collaborators for the pkgedge package pipeline:
//!
//! | Stage | Collaborator | Behavior |
//! |-------|--------------|----------|
//! | Resolve | [`PackagePathResolver`] | `/[@scope/]name[@version][/path]` URLs |
//! | Filter | [`BlacklistFilter`] | fixed list of refused package names |
//! | Fetch | [`MirrorFetcher`] | unpacked package mirror on local disk |
//! | Emit | [`FileEmitter`] | file or metadata response with cache validators |
//!
//! ## Example
//!
//! ```
//! use pkgedge_middleware::Pipeline;
//! use pkgedge_packages::{BlacklistFilter, FileEmitter, MirrorFetcher, PackagePathResolver};
//!
//! let pipeline = Pipeline::package(
//!     PackagePathResolver::new(),
//!     BlacklistFilter::new(["evil-pkg"]),
//!     MirrorFetcher::new("packages"),
//!     FileEmitter::default(),
//! );
//! assert_eq!(pipeline.stage_count(), 4);
//! ```

#![doc(html_root_url = "https://docs.rs/pkgedge-packages/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod blacklist;
pub mod emitter;
pub mod integrity;
pub mod mirror;
pub mod resolver;
pub mod version;

pub use blacklist::BlacklistFilter;
pub use emitter::{FileEmitter, FileMetadata};
pub use mirror::MirrorFetcher;
pub use resolver::PackagePathResolver;
