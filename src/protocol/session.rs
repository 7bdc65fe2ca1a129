//! Transport session record.
//!
//! The proxy service opens every connection with an `open` frame whose
//! payload describes the session:
//!
//! ```json
//! {"sid": "lv1vNUx0", "pingInterval": 25000, "pingTimeout": 60000, "upgrades": []}
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

// ============================================================================
// Wire Format
// ============================================================================

/// Open-packet JSON as sent by the server.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenPayload {
    sid: String,
    ping_interval: u64,
    ping_timeout: u64,
    #[serde(default)]
    upgrades: Vec<String>,
}

// ============================================================================
// Session
// ============================================================================

/// Immutable description of an established connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    ping_interval: Duration,
    ping_timeout: Duration,
    upgrades: Vec<String>,
}

impl Session {
    /// Parses the payload of an `open` frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the payload is not a valid session
    /// object.
    pub fn from_open_payload(payload: &[u8]) -> Result<Self> {
        let open: OpenPayload = serde_json::from_slice(payload)
            .map_err(|e| Error::protocol(format!("Invalid open packet: {e}")))?;

        Ok(Self {
            id: open.sid,
            ping_interval: Duration::from_millis(open.ping_interval),
            ping_timeout: Duration::from_millis(open.ping_timeout),
            upgrades: open.upgrades,
        })
    }

    /// Returns the session id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the keep-alive interval.
    #[inline]
    #[must_use]
    pub const fn ping_interval(&self) -> Duration {
        self.ping_interval
    }

    /// Returns the keep-alive timeout.
    #[inline]
    #[must_use]
    pub const fn ping_timeout(&self) -> Duration {
        self.ping_timeout
    }

    /// Returns the transports the server offers to upgrade to.
    #[inline]
    #[must_use]
    pub fn upgrades(&self) -> &[String] {
        &self.upgrades
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open_payload() {
        let payload =
            br#"{"sid":"abc123","pingInterval":25000,"pingTimeout":60000,"upgrades":["websocket"]}"#;
        let session = Session::from_open_payload(payload).expect("parse session");

        assert_eq!(session.id(), "abc123");
        assert_eq!(session.ping_interval(), Duration::from_secs(25));
        assert_eq!(session.ping_timeout(), Duration::from_secs(60));
        assert_eq!(session.upgrades(), ["websocket".to_string()]);
    }

    #[test]
    fn test_parse_open_payload_without_upgrades() {
        let payload = br#"{"sid":"x","pingInterval":1000,"pingTimeout":2000}"#;
        let session = Session::from_open_payload(payload).expect("parse session");
        assert!(session.upgrades().is_empty());
    }

    #[test]
    fn test_parse_invalid_open_payload() {
        let err = Session::from_open_payload(b"not json").unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));

        let err = Session::from_open_payload(br#"{"sid":"x"}"#).unwrap_err();
        assert!(matches!(err, Error::Protocol { .. }));
    }
}
