//! BtleJuice client - Bluetooth LE interception over a BtleJuice proxy.
//!
//! This library connects to a running BtleJuice proxy, which sits between a
//! BLE central and a target device, and lets Rust code watch or rewrite the
//! GATT traffic it relays.
//!
//! # Architecture
//!
//! - **Proxy (remote)**: relays GATT reads, writes and notifications, and
//!   reports each one as an event over a WebSocket
//! - **Client (Rust)**: decodes those events, dispatches them to registered
//!   [`ProxyHandler`]s, and emits the proxy's next step
//!
//! Key design principles:
//!
//! - One [`ProxyClient`] owns one WebSocket connection and one event loop task
//! - Events are dispatched by name through a static table to every
//!   registered handler, in registration order
//! - Interception decisions are values ([`Outcome`]), never errors
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use btlejuice::{Hooks, InterceptionEngine, Outcome, ProxyClient, ReadOutcome, Result};
//!
//! struct FullBattery;
//!
//! impl Hooks for FullBattery {
//!     fn on_before_read(&self, service: &str, characteristic: &str, _offset: u64) -> ReadOutcome {
//!         if service == "180f" && characteristic == "2a19" {
//!             Outcome::ShortCircuit(vec![100])
//!         } else {
//!             Outcome::Forward
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let engine = Arc::new(InterceptionEngine::new("aa:bb:cc:dd:ee:ff", FullBattery));
//!
//!     let client = ProxyClient::builder()
//!         .host("localhost")
//!         .port(8080)
//!         .handler(engine)
//!         .connect()
//!         .await?;
//!
//!     client.closed().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`ProxyClient`], builder and options |
//! | [`dispatch`] | [`ProxyHandler`], [`Namespace`] registry, [`Emitter`] |
//! | [`intercept`] | [`InterceptionEngine`], [`Hooks`], [`Observer`], [`Outcome`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Frame and packet codecs |
//! | [`transport`] | WebSocket transport layer |
//! | [`utils`] | HexII rendering |

// ============================================================================
// Modules
// ============================================================================

/// Proxy client and configuration.
///
/// Use [`ProxyClient::builder()`] to connect.
pub mod client;

/// Event dispatch to registered handlers.
pub mod dispatch;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Operation interception.
pub mod intercept;

/// Wire protocol codecs.
///
/// Frames, packets, binary attachments and the event name table.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

/// Display helpers.
pub mod utils;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, ClientOptions, ProxyClient};

// Dispatch types
pub use dispatch::{Emitter, Namespace, ProxyHandler, WriteRequest};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{AckId, CharacteristicKey};

// Interception types
pub use intercept::{
    Hooks, InterceptionEngine, NotificationOutcome, Observer, Operation, OperationState, Outcome,
    ReadOutcome, ReadResponseOutcome, Sniffer, SubscribeOutcome, WriteOutcome,
};

// Protocol types
pub use protocol::{Arg, Frame, FrameType, OutboundEvent, Session};

// Utilities
pub use utils::hexii;
