//! WebSocket transport layer.
//!
//! This module moves frames between the proxy's WebSocket endpoint and the
//! joined namespaces.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                               ┌──────────────────┐
//! │  ProxyClient     │                               │  BtleJuice proxy │
//! │                  │          WebSocket            │                  │
//! │  Connection ─────┼──────────────────────────────►│  /socket.io/     │
//! │   └─ Router      │◄──────────────────────────────┼─ frames          │
//! │       └─ Namespace(s) ─► ProxyHandler(s)         │                  │
//! └──────────────────┘                               └──────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. Open the WebSocket (`?EIO=3&transport=websocket`)
//! 2. `Connection::handshake` - Wait for the `open` frame and parse the session
//! 3. `Connection::spawn` - Route frames, send queued events, ping periodically
//! 4. `Connection::shutdown` - Close the socket; namespaces see a disconnect
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `router` | Frame routing and attachment assembly |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Frame routing and attachment assembly.
pub mod router;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use router::{Inbound, Routed, Router};
