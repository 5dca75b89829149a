//! # pkgedge Server
//!
//! The runnable edge server: routing, the landing page, pre-built assets,
//! statistics providers and the hyper accept loop.
//!
//! | Route | Served by |
//! |-------|-----------|
//! | `GET`/`HEAD /` | [`LandingPage`] |
//! | files under `assets.dir` | [`StaticFiles`] |
//! | everything else | the package [`Pipeline`](pkgedge_middleware::Pipeline) |
//!
//! ## Example
//!
//! ```rust,no_run
//! use pkgedge_config::ConfigLoader;
//! use pkgedge_server::{App, Server};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new().with_env_prefix("PKGEDGE").load()?;
//! let app = App::from_config(&config)?;
//! Server::new(app, &config.server).run().await?;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/pkgedge-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod app;
pub mod error;
pub mod landing;
pub mod server;
pub mod shutdown;
pub mod static_files;
pub mod stats;

pub use app::{App, AppBuilder};
pub use error::ServerError;
pub use landing::LandingPage;
pub use server::Server;
pub use shutdown::ShutdownSignal;
pub use static_files::StaticFiles;
pub use stats::{HttpStatsProvider, StaticStatsProvider};

/// Crate version, reported by `pkgedge --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
