//! Battery level hooking.
//!
//! Demonstrates:
//! - Forcing the response of a characteristic read
//! - Dismissing notification subscriptions before they reach the device
//! - Reacting to proxy setup and readiness
//!
//! Reads of the battery level (`180f`/`2a19`) answer a level that counts
//! down from 9 and wraps to 100 after 0.
//!
//! Usage:
//!   cargo run --example hooking -- --target aa:bb:cc:dd:ee:ff
//!   cargo run --example hooking -- -s 192.168.1.10 -p 8080 -t aa:bb:cc:dd:ee:ff --debug

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use btlejuice::{
    Emitter, Hooks, InterceptionEngine, Outcome, ProxyClient, ReadOutcome, SubscribeOutcome,
};
use common::Args;
use parking_lot::Mutex;

// ============================================================================
// Constants
// ============================================================================

const BATTERY_SERVICE: &str = "180f";
const BATTERY_LEVEL: &str = "2a19";

// ============================================================================
// Hooks
// ============================================================================

/// Fakes the battery level and dismisses every subscription.
struct BatteryHooks {
    level: Mutex<i32>,
}

impl BatteryHooks {
    fn new() -> Self {
        Self {
            level: Mutex::new(10),
        }
    }

    fn next_level(&self) -> u8 {
        let mut level = self.level.lock();
        *level -= 1;
        if *level < 0 {
            *level = 100;
        }
        *level as u8
    }
}

impl Hooks for BatteryHooks {
    fn on_proxy_setup(&self, _emitter: &Emitter) {
        println!("[i] Target found, setting up proxy ...");
    }

    fn on_proxy_ready(&self, _emitter: &Emitter) {
        println!("[i] Proxy ready !");
    }

    fn on_before_read(&self, service: &str, characteristic: &str, _offset: u64) -> ReadOutcome {
        if service.eq_ignore_ascii_case(BATTERY_SERVICE)
            && characteristic.eq_ignore_ascii_case(BATTERY_LEVEL)
        {
            return Outcome::ShortCircuit(vec![self.next_level()]);
        }
        Outcome::Forward
    }

    fn on_before_subscribe(
        &self,
        _service: &str,
        _characteristic: &str,
        _enabled: bool,
    ) -> SubscribeOutcome {
        Outcome::ShortCircuit(())
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
    let engine = Arc::new(InterceptionEngine::new(args.target, BatteryHooks::new()));

    let client = ProxyClient::builder()
        .host(args.server)
        .port(args.port)
        .handler(engine)
        .connect()
        .await?;

    common::wait_for_exit(&client).await;
    Ok(())
}
