//! Outbound event emission.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::{Arg, OutboundEvent, encode_event};

// ============================================================================
// Outgoing
// ============================================================================

/// An event queued for the connection loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Outgoing {
    /// Namespace path; empty for the root namespace.
    pub path: String,
    /// Event name.
    pub event: OutboundEvent,
    /// Event arguments (without the name).
    pub args: Vec<Arg>,
}

impl Outgoing {
    /// Encodes the event into message text plus binary attachments.
    #[must_use]
    pub fn encode(self) -> (String, Vec<Vec<u8>>) {
        let mut args = Vec::with_capacity(self.args.len() + 1);
        args.push(Arg::from(self.event.as_str()));
        args.extend(self.args);
        encode_event(&self.path, None, args)
    }
}

// ============================================================================
// Emitter
// ============================================================================

/// Sends events to the proxy on behalf of one namespace.
///
/// Cheap to clone; all clones feed the same connection loop.
#[derive(Debug, Clone)]
pub struct Emitter {
    path: Arc<str>,
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl Emitter {
    /// Creates an emitter for `path` that queues onto `tx`.
    #[must_use]
    pub fn new(path: impl Into<Arc<str>>, tx: mpsc::UnboundedSender<Outgoing>) -> Self {
        Self {
            path: path.into(),
            tx,
        }
    }

    /// Returns the namespace path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Emits an event.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the connection loop has stopped.
    pub fn emit(&self, event: OutboundEvent, args: Vec<Arg>) -> Result<()> {
        trace!(%event, path = %self.path, "Emitting event");

        self.tx
            .send(Outgoing {
                path: self.path.to_string(),
                event,
                args,
            })
            .map_err(|_| Error::ConnectionClosed)
    }
}

// ============================================================================
// Emitter - Proxy Control
// ============================================================================

impl Emitter {
    /// Starts scanning for devices.
    pub fn scan(&self) -> Result<()> {
        self.emit(OutboundEvent::ScanDevices, Vec::new())
    }

    /// Selects the device to proxy.
    pub fn select_target(&self, target: &str) -> Result<()> {
        self.emit(OutboundEvent::Target, vec![Arg::from(target)])
    }

    /// Asks for a status update.
    pub fn get_status(&self) -> Result<()> {
        self.emit(OutboundEvent::Status, Vec::new())
    }

    /// Stops the proxy.
    pub fn stop(&self) -> Result<()> {
        self.emit(OutboundEvent::Stop, Vec::new())
    }
}

// ============================================================================
// Emitter - Device Operations
// ============================================================================

impl Emitter {
    /// Writes to a device characteristic.
    pub fn device_write(
        &self,
        service: &str,
        characteristic: &str,
        data: &[u8],
        offset: u64,
        without_response: bool,
    ) -> Result<()> {
        self.emit(
            OutboundEvent::BleWrite,
            vec![
                Arg::from(service),
                Arg::from(characteristic),
                Arg::from(data),
                Arg::from(offset),
                Arg::from(without_response),
            ],
        )
    }

    /// Reads a device characteristic.
    pub fn device_read(&self, service: &str, characteristic: &str) -> Result<()> {
        self.emit(
            OutboundEvent::BleRead,
            vec![Arg::from(service), Arg::from(characteristic)],
        )
    }

    /// Subscribes to or unsubscribes from device notifications.
    pub fn device_notify(&self, service: &str, characteristic: &str, enabled: bool) -> Result<()> {
        self.emit(
            OutboundEvent::BleNotify,
            vec![
                Arg::from(service),
                Arg::from(characteristic),
                Arg::from(enabled),
            ],
        )
    }
}

// ============================================================================
// Emitter - Proxy Responses
// ============================================================================

impl Emitter {
    /// Answers a central write.
    pub fn proxy_write_resp(&self, service: &str, characteristic: &str, error: Arg) -> Result<()> {
        self.emit(
            OutboundEvent::ProxyWriteResp,
            vec![Arg::from(service), Arg::from(characteristic), error],
        )
    }

    /// Answers a central read.
    pub fn proxy_read_resp(&self, service: &str, characteristic: &str, data: &[u8]) -> Result<()> {
        self.emit(
            OutboundEvent::ProxyReadResp,
            vec![Arg::from(service), Arg::from(characteristic), Arg::from(data)],
        )
    }

    /// Relays notification data to the central.
    pub fn proxy_notify_data(
        &self,
        service: &str,
        characteristic: &str,
        data: &[u8],
    ) -> Result<()> {
        self.emit(
            OutboundEvent::ProxyData,
            vec![Arg::from(service), Arg::from(characteristic), Arg::from(data)],
        )
    }

    /// Answers a central subscription.
    pub fn proxy_notify_resp(&self, service: &str, characteristic: &str) -> Result<()> {
        self.emit(
            OutboundEvent::ProxyNotifyResp,
            vec![Arg::from(service), Arg::from(characteristic)],
        )
    }
}

/// Write-response error value meaning "no error".
#[inline]
#[must_use]
pub fn no_error() -> Arg {
    Arg::Json(Value::Bool(false))
}

// ============================================================================
// Tests
// ============================================================================
