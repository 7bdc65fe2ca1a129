//! GATT traffic sniffer.
//!
//! Demonstrates:
//! - Observing reads, writes, subscriptions and notifications without
//!   changing them
//! - Registering a second handler for central connect/disconnect events
//! - Rendering data with HexII
//!
//! Usage:
//!   cargo run --example sniffer -- --target aa:bb:cc:dd:ee:ff
//!   cargo run --example sniffer -- -s 192.168.1.10 -p 8080 -t aa:bb:cc:dd:ee:ff

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use btlejuice::{Emitter, InterceptionEngine, Observer, ProxyClient, ProxyHandler, hexii};
use common::Args;

// ============================================================================
// Observers
// ============================================================================

/// Prints every relayed operation.
struct Printer;

impl Observer for Printer {
    fn on_data_read(&self, service: &str, characteristic: &str, data: &[u8]) {
        println!("[<][{service} - {characteristic}] {}", hexii(data));
    }

    fn on_data_write(
        &self,
        service: &str,
        characteristic: &str,
        data: &[u8],
        _offset: u64,
        _without_response: bool,
    ) {
        println!("[>][{service} - {characteristic}] {}", hexii(data));
    }

    fn on_subscribe_notification(&self, service: &str, characteristic: &str, enabled: bool) {
        println!("[N][{service} - {characteristic}] {enabled}");
    }

    fn on_notification_data(&self, service: &str, characteristic: &str, data: &[u8]) {
        println!("[!][{service} - {characteristic}] {}", hexii(data));
    }
}

/// Prints central connections.
struct Centrals;

impl ProxyHandler for Centrals {
    fn client_connected(&self, _emitter: &Emitter, client: &str) {
        println!("** Connection from {client}");
    }

    fn client_disconnected(&self, _emitter: &Emitter, client: &str) {
        println!("** Disconnection from {client}");
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = match Args::parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            std::process::exit(2);
        }
    };
    common::init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let client = ProxyClient::builder()
        .host(args.server)
        .port(args.port)
        .handler(Arc::new(InterceptionEngine::sniffer(args.target, Printer)))
        .handler(Arc::new(Centrals))
        .connect()
        .await?;

    common::wait_for_exit(&client).await;
    Ok(())
}
