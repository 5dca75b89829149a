//! pkgedge - package file edge server.

use std::path::PathBuf;

use tracing::{error, info};

use pkgedge_config::ConfigLoader;
use pkgedge_server::{App, Server};

/// Command-line arguments.
struct Args {
    /// Path to configuration file.
    config: Option<PathBuf>,
    /// Listen address override.
    addr: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;
        let mut addr = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--addr" | "-a" => {
                    addr = args.next();
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("pkgedge {}", pkgedge_server::VERSION);
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config, addr }
    }
}

fn print_help() {
    println!(
        r"pkgedge - package file edge server

USAGE:
    pkgedge [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file (TOML or JSON)
    -a, --addr <ADDR>      Listen address, overrides server.http_addr
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    PKGEDGE__ENVIRONMENT              test | development | production
    PKGEDGE__SERVER__HTTP_ADDR        Listen address (default: 0.0.0.0:8080)
    PKGEDGE__ASSETS__DIR              Pre-built site directory (default: build)
    PKGEDGE__STATS__URL               Edge statistics endpoint
    PKGEDGE__PACKAGES__MIRROR_DIR     Package mirror root
    PKGEDGE__PACKAGES__BLACKLIST      Comma-separated package names to refuse
    RUST_LOG                          Diagnostic log filter

EXAMPLES:
    pkgedge --config /etc/pkgedge/pkgedge.toml
    PKGEDGE__ENVIRONMENT=production pkgedge --addr 127.0.0.1:3000
"
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();

    let loader = ConfigLoader::new();
    let loader = match &args.config {
        Some(path) => loader.with_file(path),
        None => loader.with_optional_file("pkgedge.toml"),
    };
    let loaded = loader
        .and_then(ConfigLoader::with_dotenv)
        .and_then(|loader| loader.with_env_prefix("PKGEDGE").load());
    let mut config = match loaded {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Some(addr) = args.addr {
        config.server.http_addr = addr;
        if let Err(e) = config.validate() {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    }

    if let Err(e) = pkgedge_telemetry::init_logging(&config.log_config()) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    info!(
        version = pkgedge_server::VERSION,
        environment = ?config.environment,
        "Starting pkgedge"
    );

    let app = match App::from_config(&config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to create app: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = Server::new(app, &config.server).run().await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
