//! Proxy client.
//!
//! This module provides the entry point for talking to a BtleJuice proxy.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ProxyClient`] | Connection to the proxy and its joined namespace |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`ClientOptions`] | Host, port, resource, namespace, timeout |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use btlejuice::{InterceptionEngine, Observer, ProxyClient, Result};
//!
//! struct Printer;
//!
//! impl Observer for Printer {
//!     fn on_data_read(&self, service: &str, characteristic: &str, data: &[u8]) {
//!         println!("read {service}:{characteristic} {data:02x?}");
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let sniffer = Arc::new(InterceptionEngine::sniffer("aa:bb:cc:dd:ee:ff", Printer));
//! let client = ProxyClient::builder()
//!     .host("localhost")
//!     .handler(sniffer)
//!     .connect()
//!     .await?;
//!
//! client.closed().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Connection options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::ProxyClient;
pub use options::ClientOptions;
