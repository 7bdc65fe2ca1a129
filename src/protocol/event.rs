//! Proxy event names.
//!
//! # Inbound (proxy → client)
//!
//! | Name | Meaning |
//! |------|---------|
//! | `app.status` | Proxy status update |
//! | `app.target` | Target selected |
//! | `app.connect` / `app.disconnect` | Central connected to / disconnected from the dummy device |
//! | `peripheral` | Device discovered while scanning |
//! | `ready` | Proxy connected to the target |
//! | `proxy_read` / `proxy_write` / `proxy_notify` | Central-side GATT request |
//! | `ble_read_resp` / `ble_write_resp` / `ble_notify_resp` | Device-side GATT response |
//! | `data` | Device notification |
//! | `profile` | Target GATT profile |
//!
//! # Outbound (client → proxy)
//!
//! See [`OutboundEvent`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Inbound Names
// ============================================================================

/// Proxy status update.
pub const APP_STATUS: &str = "app.status";
/// Target selected.
pub const APP_TARGET: &str = "app.target";
/// Central connected to the proxy's dummy device.
pub const APP_CONNECT: &str = "app.connect";
/// Central disconnected from the proxy's dummy device.
pub const APP_DISCONNECT: &str = "app.disconnect";
/// Device discovered.
pub const PERIPHERAL: &str = "peripheral";
/// Proxy ready.
pub const READY: &str = "ready";
/// Device notification data.
pub const DATA: &str = "data";
/// Device write acknowledgement.
pub const BLE_WRITE_RESP: &str = "ble_write_resp";
/// Device read result.
pub const BLE_READ_RESP: &str = "ble_read_resp";
/// Device subscription acknowledgement.
pub const BLE_NOTIFY_RESP: &str = "ble_notify_resp";
/// Target profile.
pub const PROFILE: &str = "profile";
/// Central write request.
pub const PROXY_WRITE: &str = "proxy_write";
/// Central read request.
pub const PROXY_READ: &str = "proxy_read";
/// Central subscription request.
pub const PROXY_NOTIFY: &str = "proxy_notify";

// ============================================================================
// OutboundEvent
// ============================================================================

/// Events the client emits to the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboundEvent {
    /// Start scanning for devices.
    ScanDevices,
    /// Select the device to proxy.
    Target,
    /// Request a status update.
    Status,
    /// Stop the proxy.
    Stop,
    /// Write to a device characteristic.
    BleWrite,
    /// Read a device characteristic.
    BleRead,
    /// Subscribe to or unsubscribe from device notifications.
    BleNotify,
    /// Answer a central write.
    ProxyWriteResp,
    /// Answer a central read.
    ProxyReadResp,
    /// Relay notification data to the central.
    ProxyData,
    /// Answer a central subscription.
    ProxyNotifyResp,
}

impl OutboundEvent {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ScanDevices => "scan_devices",
            Self::Target => "target",
            Self::Status => "status",
            Self::Stop => "stop",
            Self::BleWrite => "ble_write",
            Self::BleRead => "ble_read",
            Self::BleNotify => "ble_notify",
            Self::ProxyWriteResp => "proxy_write_resp",
            Self::ProxyReadResp => "proxy_read_resp",
            Self::ProxyData => "proxy_data",
            Self::ProxyNotifyResp => "proxy_notify_resp",
        }
    }
}

impl fmt::Display for OutboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
