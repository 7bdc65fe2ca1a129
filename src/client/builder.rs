//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and connecting a [`ProxyClient`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use btlejuice::{Hooks, InterceptionEngine, ProxyClient};
//!
//! struct PassThrough;
//! impl Hooks for PassThrough {}
//!
//! # async fn example() -> btlejuice::Result<()> {
//! let client = ProxyClient::builder()
//!     .host("localhost")
//!     .port(8080)
//!     .handler(Arc::new(InterceptionEngine::new("aa:bb:cc:dd:ee:ff", PassThrough)))
//!     .connect()
//!     .await?;
//!
//! client.closed().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::ProxyHandler;
use crate::error::{Error, Result};

use super::core::ProxyClient;
use super::options::ClientOptions;

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`ProxyClient`].
///
/// Use [`ProxyClient::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Connection options.
    options: ClientOptions,
    /// Handlers registered before the connection opens.
    handlers: Vec<Arc<dyn ProxyHandler>>,
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("options", &self.options)
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the proxy host (name or URL).
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.options.host = host.into();
        self
    }

    /// Sets the proxy port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.options.port = Some(port);
        self
    }

    /// Sets the endpoint resource.
    #[inline]
    #[must_use]
    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.options.resource = resource.into();
        self
    }

    /// Sets the namespace to join.
    #[inline]
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.options.namespace = namespace.into();
        self
    }

    /// Sets the connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Replaces all options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers a handler before connecting, so it sees the namespace
    /// connect event.
    #[inline]
    #[must_use]
    pub fn handler(mut self, handler: Arc<dyn ProxyHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Validates the configuration and connects.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the options are invalid
    /// - Any error from [`ProxyClient::connect`]
    pub async fn connect(self) -> Result<ProxyClient> {
        self.validate()?;
        ProxyClient::connect_with(self.options, self.handlers).await
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the options.
    fn validate(&self) -> Result<()> {
        let options = &self.options;

        if options.host.trim().is_empty() {
            return Err(Error::config(
                "Proxy host is required. Use .host() to set it.\n\
                 Example: ProxyClient::builder().host(\"localhost\")",
            ));
        }

        if !options.namespace.starts_with('/') {
            return Err(Error::config(format!(
                "Namespace must start with '/', got '{}'",
                options.namespace
            )));
        }

        if options.resource.trim_matches('/').is_empty() {
            return Err(Error::config("Endpoint resource must not be empty"));
        }

        if options.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be greater than zero"));
        }

        options.ws_url()?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
