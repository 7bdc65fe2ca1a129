//! Handler callbacks.

// ============================================================================
// Imports
// ============================================================================

use crate::protocol::Arg;

use super::Emitter;

// ============================================================================
// WriteRequest
// ============================================================================

/// A characteristic write, as requested by the central.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    /// Service UUID.
    pub service: String,
    /// Characteristic UUID.
    pub characteristic: String,
    /// Data to write.
    pub data: Vec<u8>,
    /// Write offset.
    pub offset: u64,
    /// Write command (no acknowledgement expected).
    pub without_response: bool,
}

impl WriteRequest {
    /// Creates a write request at offset 0 expecting a response.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        characteristic: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            service: service.into(),
            characteristic: characteristic.into(),
            data,
            offset: 0,
            without_response: false,
        }
    }

    /// Replaces the data, keeping the target and flags.
    #[must_use]
    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Replaces the offset.
    #[must_use]
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Replaces the write-without-response flag.
    #[must_use]
    pub fn with_without_response(mut self, without_response: bool) -> Self {
        self.without_response = without_response;
        self
    }
}

// ============================================================================
// ProxyHandler
// ============================================================================

/// Receives proxy events for a namespace.
///
/// Every callback has a no-op default, so implementors only override what
/// they care about. `emitter` sends events back through the same namespace.
///
/// Callbacks run on the connection loop and should return quickly. A
/// panicking callback is logged and does not stop delivery to the other
/// registered handlers.
#[allow(unused_variables)]
pub trait ProxyHandler: Send + Sync {
    /// The namespace connected to the proxy service.
    fn connected(&self, emitter: &Emitter) {}

    /// The namespace disconnected from the proxy service.
    fn disconnected(&self, emitter: &Emitter) {}

    /// A central connected to the proxy's dummy device.
    fn client_connected(&self, emitter: &Emitter, client: &str) {}

    /// A central disconnected from the proxy's dummy device.
    fn client_disconnected(&self, emitter: &Emitter, client: &str) {}

    /// A device was found while scanning.
    fn device_found(&self, emitter: &Emitter, device: &str, name: &str, rssi: i64) {}

    /// A target was selected.
    fn target_selected(&self, emitter: &Emitter, target: &str) {}

    /// The proxy status changed.
    fn status_updated(&self, emitter: &Emitter, status: &Arg) {}

    /// The proxy is connected to the target and relaying traffic.
    fn proxy_ready(&self, emitter: &Emitter) {}

    /// The target's GATT profile is available.
    fn profile_updated(&self, emitter: &Emitter, profile: &Arg) {}

    /// The central asked to write a characteristic.
    fn write_request(&self, emitter: &Emitter, request: &WriteRequest) {}

    /// The device acknowledged a write.
    fn write_response(&self, emitter: &Emitter, service: &str, characteristic: &str, error: &Arg) {}

    /// The central asked to read a characteristic.
    fn read_request(&self, emitter: &Emitter, service: &str, characteristic: &str, offset: u64) {}

    /// The device answered a read.
    fn read_response(&self, emitter: &Emitter, service: &str, characteristic: &str, data: &[u8]) {}

    /// The central asked to (un)subscribe to notifications.
    fn notify_request(
        &self,
        emitter: &Emitter,
        service: &str,
        characteristic: &str,
        enabled: bool,
    ) {
    }

    /// The device acknowledged a subscription.
    fn notify_response(&self, emitter: &Emitter, service: &str, characteristic: &str) {}

    /// The device sent a notification.
    fn notification_data(
        &self,
        emitter: &Emitter,
        service: &str,
        characteristic: &str,
        data: &[u8],
    ) {
    }
}

// ============================================================================
// Tests
// ============================================================================
