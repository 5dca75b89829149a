//! Typed configuration for pkgedge.
//!
//! Configuration is loaded in layers, later layers overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. A TOML or JSON file
//! 3. A `.env` file (via `dotenvy`)
//! 4. `PKGEDGE__SECTION__KEY` environment variables
//!
//! ```no_run
//! use pkgedge_config::ConfigLoader;
//!
//! # fn main() -> Result<(), pkgedge_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("pkgedge.toml")?
//!     .with_dotenv()?
//!     .with_env_prefix("PKGEDGE")
//!     .load()?;
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! Unknown fields are rejected so that typos in deployment files fail
//! loudly instead of silently falling back to defaults.

#![doc(html_root_url = "https://docs.rs/pkgedge-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::EdgeConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use pkgedge_telemetry::Environment;
pub use schema::{
    AssetsConfig, LandingConfig, LoggingConfig, PackagesConfig, ServerConfig, StatsConfig,
};
