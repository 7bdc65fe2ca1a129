//! Shared utilities for demos.
//!
//! Provides common functionality used across all demos:
//! - Command-line argument parsing
//! - Logging initialization
//! - Waiting for Ctrl+C or a closed connection

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use anyhow::{Context, bail};
use btlejuice::ProxyClient;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments for demos.
#[derive(Debug, Clone)]
pub struct Args {
    /// Proxy host (`--server`, `-s`).
    pub server: String,
    /// Proxy port (`--port`, `-p`).
    pub port: u16,
    /// Target device address (`--target`, `-t`).
    pub target: String,
    /// Verbose logging (`--debug`).
    pub debug: bool,
}

impl Args {
    /// Parses command-line arguments.
    pub fn parse() -> anyhow::Result<Self> {
        Self::parse_from(std::env::args().skip(1))
    }

    /// Parses arguments from an iterator, without the program name.
    pub fn parse_from(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut server = String::from("localhost");
        let mut port = 8080;
        let mut target = None;
        let mut debug = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--server" | "-s" => {
                    server = args.next().context("--server needs a value")?;
                }
                "--port" | "-p" => {
                    let value = args.next().context("--port needs a value")?;
                    port = value
                        .parse()
                        .with_context(|| format!("invalid port '{value}'"))?;
                }
                "--target" | "-t" => {
                    target = Some(args.next().context("--target needs a value")?);
                }
                "--debug" => debug = true,
                other => bail!("unknown argument '{other}'"),
            }
        }

        let Some(target) = target else {
            bail!("--target <BD address> is required");
        };

        Ok(Self {
            server,
            port,
            target,
            debug,
        })
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Initialize tracing/logging.
///
/// `RUST_LOG` overrides the default filter.
pub fn init_logging(debug: bool) {
    let default = if debug { "btlejuice=debug" } else { "btlejuice=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Waits for Ctrl+C or for the proxy to close the connection.
pub async fn wait_for_exit(client: &ProxyClient) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("[i] Stopping ...");
            client.shutdown();
            client.closed().await;
        }
        () = client.closed() => {
            println!("[i] Proxy closed the connection");
        }
    }
}
