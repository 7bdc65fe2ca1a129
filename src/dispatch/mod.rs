//! Event dispatch.
//!
//! Decoded events are routed by name to every [`ProxyHandler`] registered on
//! the receiving [`Namespace`]. Handlers talk back through an [`Emitter`].
//!
//! # Handler Callbacks
//!
//! | Inbound Event | Callback |
//! |---------------|----------|
//! | namespace connect | `connected` |
//! | namespace disconnect | `disconnected` |
//! | `app.connect` | `client_connected` |
//! | `app.disconnect` | `client_disconnected` |
//! | `peripheral` | `device_found` |
//! | `app.target` | `target_selected` |
//! | `app.status` | `status_updated` |
//! | `ready` | `proxy_ready` |
//! | `profile` | `profile_updated` |
//! | `proxy_write` | `write_request` |
//! | `ble_write_resp` | `write_response` |
//! | `proxy_read` | `read_request` |
//! | `ble_read_resp` | `read_response` |
//! | `proxy_notify` | `notify_request` |
//! | `ble_notify_resp` | `notify_response` |
//! | `data` | `notification_data` |
//!
//! Unknown event names are ignored.

// ============================================================================
// Submodules
// ============================================================================

/// Outbound event emission.
pub mod emitter;

/// Handler trait.
pub mod handler;

/// Handler registry and fan-out.
pub mod namespace;

// ============================================================================
// Re-exports
// ============================================================================

pub use emitter::{Emitter, Outgoing, no_error};
pub use handler::{ProxyHandler, WriteRequest};
pub use namespace::Namespace;
