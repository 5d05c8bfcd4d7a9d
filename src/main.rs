//! linekv server entry point.
//!
//! Parses command-line flags, sets up logging, starts the storage engine,
//! the background reaper and the TCP server, then waits for a shutdown
//! signal and stops everything under a bounded grace period.

use linekv::server::Server;
use linekv::storage::{start_reaper, Store};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::signal::unix::{signal as unix_signal, SignalKind};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How long shutdown may take before the process exits regardless.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Log verbosity (trace, debug, info, warn, error)
    log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: linekv::DEFAULT_HOST.to_string(),
            port: linekv::DEFAULT_PORT,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--log-level" | "-l" => {
                    if i + 1 < args.len() {
                        config.log_level = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --log-level requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("linekv version {}", linekv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
linekv - A Minimal In-Memory Key-Value Store

USAGE:
    linekv [OPTIONS]

OPTIONS:
    -h, --host <HOST>         Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>         Port to listen on (default: 4000)
    -l, --log-level <LEVEL>   Log verbosity (default: info)
    -v, --version             Print version information
        --help                Print this help message

EXAMPLES:
    linekv                         # Start on 127.0.0.1:4000
    linekv --port 4001             # Start on port 4001
    linekv --host 0.0.0.0          # Listen on all interfaces

CONNECTING:
    Commands are plain text lines, one per request:
    $ nc 127.0.0.1 4000
    SET name bar
    +OK
    GET name
    $3
    bar
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Set up logging; RUST_LOG overrides the flag when present.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| anyhow::anyhow!("invalid log level '{}': {}", config.log_level, e))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(version = linekv::VERSION, "Starting linekv");

    // The storage engine, shared across all connections
    let storage = Arc::new(Store::new());

    // Background reaper for expired keys; stops when dropped at exit
    let _reaper = start_reaper(Arc::clone(&storage));

    let (server, shutdown) = Server::bind(&config.bind_address(), storage).await?;
    tokio::spawn(server.run());

    wait_for_shutdown_signal().await?;
    info!("Shutdown signal received");

    match tokio::time::timeout(SHUTDOWN_GRACE, shutdown.shutdown()).await {
        Ok(()) => info!("Graceful shutdown completed"),
        Err(_) => warn!("Shutdown timeout, forcing exit"),
    }

    Ok(())
}

/// Resolves when SIGINT or SIGTERM arrives.
async fn wait_for_shutdown_signal() -> anyhow::Result<()> {
    let mut sigterm = unix_signal(SignalKind::terminate())?;

    tokio::select! {
        result = signal::ctrl_c() => result?,
        _ = sigterm.recv() => {}
    }

    Ok(())
}
