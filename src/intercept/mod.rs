//! Operation interception.
//!
//! [`InterceptionEngine`] is a [`ProxyHandler`](crate::dispatch::ProxyHandler)
//! that asks [`Hooks`] what to do with each proxied operation.
//!
//! | Operation | Hook | `Modify` | `ShortCircuit` |
//! |-----------|------|----------|----------------|
//! | read request | `on_before_read` | ignored | answer with data, skip device |
//! | read response | `on_after_read` | relay new data | relay new data |
//! | write request | `on_before_write` | write the new request | acknowledge with no error |
//! | subscribe | `on_before_subscribe` | use the new flag | acknowledge, skip device |
//! | notification | `on_before_notification` | relay new data | suppress |
//!
//! Write and subscribe acknowledgements from the device are relayed
//! unchanged.

// ============================================================================
// Submodules
// ============================================================================

/// Interception engine.
pub mod engine;

/// Hook and observer traits.
pub mod hooks;

/// Hook outcomes.
pub mod outcome;

// ============================================================================
// Re-exports
// ============================================================================

pub use engine::{InterceptionEngine, Operation, OperationState};
pub use hooks::{Hooks, Observer, Sniffer};
pub use outcome::{
    NotificationOutcome, Outcome, ReadOutcome, ReadResponseOutcome, SubscribeOutcome, WriteOutcome,
};
