//! Proxy connection options.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use btlejuice::ClientOptions;
//!
//! let options = ClientOptions::new()
//!     .with_host("192.168.1.20")
//!     .with_port(8080)
//!     .with_connect_timeout(Duration::from_secs(10));
//!
//! let url = options.ws_url().unwrap();
//! assert_eq!(
//!     url.as_str(),
//!     "ws://192.168.1.20:8080/socket.io/?EIO=3&transport=websocket"
//! );
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default proxy host.
pub const DEFAULT_HOST: &str = "localhost";

/// Default proxy port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default endpoint resource.
pub const DEFAULT_RESOURCE: &str = "socket.io";

/// Root namespace path.
pub const ROOT_NAMESPACE: &str = "/";

/// Default connect and handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// ClientOptions
// ============================================================================

/// Where and how to reach the proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Host name or URL (`host`, `http://host[:port][/path]`, `https://...`).
    pub host: String,

    /// Explicit port; falls back to the URL's port, then 443/80.
    pub port: Option<u16>,

    /// Endpoint resource appended to the URL path.
    pub resource: String,

    /// Namespace to join (`/` for the root namespace).
    pub namespace: String,

    /// Bound on connecting plus waiting for the session to open.
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: Some(DEFAULT_PORT),
            resource: DEFAULT_RESOURCE.to_string(),
            namespace: ROOT_NAMESPACE.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ClientOptions {
    /// Creates options with the default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ClientOptions {
    /// Sets the host.
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets an explicit port.
    #[inline]
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Clears the explicit port so the host URL decides.
    #[inline]
    #[must_use]
    pub fn with_default_port(mut self) -> Self {
        self.port = None;
        self
    }

    /// Sets the endpoint resource.
    #[inline]
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Sets the namespace to join.
    #[inline]
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

// ============================================================================
// Resolution
// ============================================================================

impl ClientOptions {
    /// Returns the namespace path as carried on the wire (empty for root).
    #[must_use]
    pub fn namespace_path(&self) -> &str {
        match self.namespace.as_str() {
            ROOT_NAMESPACE => "",
            path => path,
        }
    }

    /// Returns `true` if the host selects a secure socket.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.host.starts_with("https")
    }

    /// Builds the WebSocket endpoint URL.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the host is not a valid URL
    /// - [`Error::Config`] if the host URL has no host name
    pub fn ws_url(&self) -> Result<Url> {
        let host = if self.host.starts_with("http") {
            Url::parse(&self.host)?
        } else {
            Url::parse(&format!("http://{}", self.host))?
        };

        let secure = host.scheme() == "https";
        let hostname = host
            .host_str()
            .ok_or_else(|| Error::config(format!("No host name in '{}'", self.host)))?;
        let port = self
            .port
            .or(host.port())
            .unwrap_or(if secure { 443 } else { 80 });

        let mut url = Url::parse(&format!(
            "{scheme}://{hostname}:{port}{path}/{resource}/",
            scheme = if secure { "wss" } else { "ws" },
            path = host.path().trim_end_matches('/'),
            resource = self.resource.trim_matches('/'),
        ))?;
        url.query_pairs_mut()
            .append_pair("EIO", "3")
            .append_pair("transport", "websocket");

        Ok(url)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::new();
        assert_eq!(options.host, "localhost");
        assert_eq!(options.port, Some(8080));
        assert_eq!(options.resource, "socket.io");
        assert_eq!(options.namespace, "/");
        assert_eq!(options.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_ws_url_plain_host() {
        let url = ClientOptions::new().ws_url().expect("url");
        assert_eq!(
            url.as_str(),
            "ws://localhost:8080/socket.io/?EIO=3&transport=websocket"
        );
    }

    #[test]
    fn test_ws_url_port_from_host() {
        let url = ClientOptions::new()
            .with_host("http://proxy.local:9000/btle")
            .with_default_port()
            .ws_url()
            .expect("url");
        assert_eq!(
            url.as_str(),
            "ws://proxy.local:9000/btle/socket.io/?EIO=3&transport=websocket"
        );
    }

    #[test]
    fn test_ws_url_secure_default_port() {
        let options = ClientOptions::new()
            .with_host("https://proxy.local")
            .with_default_port();
        assert!(options.is_secure());

        let url = options.ws_url().expect("url");
        assert_eq!(url.scheme(), "wss");
        assert_eq!(url.port_or_known_default(), Some(443));
    }

    #[test]
    fn test_ws_url_plain_default_port() {
        let url = ClientOptions::new()
            .with_default_port()
            .ws_url()
            .expect("url");
        assert_eq!(url.port_or_known_default(), Some(80));
    }

    #[test]
    fn test_ws_url_custom_resource() {
        let url = ClientOptions::new()
            .with_resource("/engine/")
            .ws_url()
            .expect("url");
        assert_eq!(url.path(), "/engine/");
    }

    #[test]
    fn test_ws_url_invalid_host() {
        let err = ClientOptions::new().with_host("http://").ws_url().unwrap_err();
        assert!(matches!(err, Error::Url(_) | Error::Config { .. }));
    }

    #[test]
    fn test_namespace_path() {
        assert_eq!(ClientOptions::new().namespace_path(), "");
        assert_eq!(
            ClientOptions::new().with_namespace("/ble").namespace_path(),
            "/ble"
        );
    }
}
