//! Proxy client.
//!
//! The [`ProxyClient`] owns one connection to the proxy and the namespace
//! joined on it.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tracing::{debug, info};

use crate::dispatch::{Emitter, Namespace, ProxyHandler};
use crate::error::{Error, Result};
use crate::protocol::{Frame, Packet, PacketType, Session, encode_message};
use crate::transport::connection::text_message;
use crate::transport::{Connection, Router};

use super::builder::ClientBuilder;
use super::options::ClientOptions;

// ============================================================================
// Types
// ============================================================================

/// Internal shared state for the client.
struct ClientInner {
    /// Options the client connected with.
    options: ClientOptions,
    /// Session opened by the proxy.
    session: Session,
    /// The joined namespace.
    namespace: Arc<Namespace>,
    /// Event loop handle.
    connection: Connection,
}

// ============================================================================
// ProxyClient
// ============================================================================

/// Connection to a BtleJuice proxy.
///
/// Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct ProxyClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for ProxyClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyClient")
            .field("session", &self.inner.session.id())
            .field("namespace", &self.inner.namespace.path())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ProxyClient - Connection
// ============================================================================

impl ProxyClient {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Connects with `options` and no handlers.
    ///
    /// Handlers registered after this returns may miss the namespace
    /// connect event; use [`ClientBuilder::handler`] to register earlier.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] / [`Error::Config`] if the endpoint cannot be built
    /// - [`Error::ConnectionTimeout`] if the socket or session does not open in time
    /// - [`Error::Connection`] if the WebSocket connection fails
    /// - [`Error::ConnectionClosed`] if the proxy closes during the handshake
    pub async fn connect(options: ClientOptions) -> Result<Self> {
        Self::connect_with(options, Vec::new()).await
    }

    /// Connects and registers `handlers` before any event is routed.
    pub(crate) async fn connect_with(
        options: ClientOptions,
        handlers: Vec<Arc<dyn ProxyHandler>>,
    ) -> Result<Self> {
        let url = options.ws_url()?;
        let timeout_ms = options.connect_timeout.as_millis() as u64;

        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
        let namespace = Arc::new(Namespace::new(Emitter::new(
            options.namespace_path(),
            outgoing_tx,
        )));
        for handler in handlers {
            namespace.register(handler);
        }

        let mut router = Router::new();
        router.add_namespace(Arc::clone(&namespace));

        info!(url = %url, "Connecting to proxy");
        let (mut ws_stream, _) = timeout(options.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| Error::connection_timeout(timeout_ms))?
            .map_err(|e| Error::connection(format!("Failed to connect to {url}: {e}")))?;

        let session =
            Connection::handshake(&mut ws_stream, &mut router, options.connect_timeout).await?;

        if !namespace.path().is_empty() {
            let join = Packet::new(Vec::new()).with_path(namespace.path());
            let message = encode_message(PacketType::Connect, &join);
            ws_stream.send(text_message(&Frame::message(message))).await?;
            debug!(path = %namespace.path(), "Joining namespace");
        }

        let connection = Connection::spawn(ws_stream, router, outgoing_rx, session.ping_interval());

        info!(session_id = %session.id(), namespace = %options.namespace, "Connected to proxy");

        Ok(Self {
            inner: Arc::new(ClientInner {
                options,
                session,
                namespace,
                connection,
            }),
        })
    }
}

// ============================================================================
// ProxyClient - Public API
// ============================================================================

impl ProxyClient {
    /// Returns the options the client connected with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    /// Returns the session opened by the proxy.
    #[inline]
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Returns the joined namespace.
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &Arc<Namespace> {
        &self.inner.namespace
    }

    /// Returns the namespace's emitter.
    #[inline]
    #[must_use]
    pub fn emitter(&self) -> &Emitter {
        self.inner.namespace.emitter()
    }

    /// Registers a handler on the joined namespace.
    pub fn register(&self, handler: Arc<dyn ProxyHandler>) -> bool {
        self.inner.namespace.register(handler)
    }

    /// Unregisters a handler from the joined namespace.
    pub fn unregister(&self, handler: &dyn ProxyHandler) -> bool {
        self.inner.namespace.unregister(handler)
    }

    /// Closes the connection.
    ///
    /// Registered handlers see a namespace disconnect once the event loop
    /// stops.
    pub fn shutdown(&self) {
        info!(session_id = %self.inner.session.id(), "Shutting down proxy client");
        self.inner.connection.shutdown();
    }

    /// Waits until the connection has stopped.
    pub async fn closed(&self) {
        self.inner.connection.closed().await;
    }

    /// Returns `true` once the connection has stopped.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.connection.is_closed()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use futures_util::StreamExt;
    use parking_lot::Mutex;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    use crate::intercept::{Hooks, InterceptionEngine, Outcome, ReadOutcome};

    const OPEN: &str = r#"0{"sid":"client-test","pingInterval":25000,"pingTimeout":60000,"upgrades":[]}"#;

    #[derive(Default)]
    struct Battery {
        setups: Mutex<usize>,
    }

    impl Hooks for Battery {
        fn on_proxy_setup(&self, _emitter: &Emitter) {
            *self.setups.lock() += 1;
        }

        fn on_before_read(
            &self,
            _service: &str,
            _characteristic: &str,
            _offset: u64,
        ) -> ReadOutcome {
            Outcome::ShortCircuit(vec![0x64])
        }
    }

    async fn next_text<S>(ws: &mut tokio_tungstenite::WebSocketStream<S>) -> String
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        loop {
            match ws.next().await.expect("message").expect("ok") {
                WsMessage::Text(text) => return text.as_str().to_string(),
                WsMessage::Binary(data) => return format!("<binary {:?}>", &data[..]),
                _ => continue,
            }
        }
    }

    #[tokio::test]
    async fn test_connect_join_and_intercept() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");

            ws.send(WsMessage::Text(OPEN.into())).await.expect("open");
            assert_eq!(next_text(&mut ws).await, "40/ble,");

            ws.send(WsMessage::Text("40/ble,".into())).await.expect("connect");
            assert_eq!(next_text(&mut ws).await, r#"42/ble,["stop"]"#);
            assert_eq!(next_text(&mut ws).await, r#"42/ble,["scan_devices"]"#);

            ws.send(WsMessage::Text(
                r#"42/ble,["peripheral","AA:BB:CC:DD:EE:FF","Tag",-60]"#.into(),
            ))
            .await
            .expect("peripheral");
            assert_eq!(next_text(&mut ws).await, r#"42/ble,["target","aa:bb:cc:dd:ee:ff"]"#);

            ws.send(WsMessage::Text(r#"42/ble,["proxy_read","180F","2A19",0]"#.into()))
                .await
                .expect("read");
            assert_eq!(
                next_text(&mut ws).await,
                r#"451-/ble,["proxy_read_resp","180F","2A19",{"_placeholder":true,"num":0}]"#
            );
            assert_eq!(next_text(&mut ws).await, "<binary [4, 100]>");
        });

        let engine = Arc::new(InterceptionEngine::new("aa:bb:cc:dd:ee:ff", Battery::default()));
        let client = ProxyClient::builder()
            .host("127.0.0.1")
            .port(port)
            .namespace("/ble")
            .connect_timeout(Duration::from_secs(5))
            .handler(engine.clone())
            .connect()
            .await
            .expect("connect");

        assert_eq!(client.session().id(), "client-test");
        assert_eq!(client.namespace().path(), "/ble");

        server.await.expect("server script");
        assert_eq!(*engine.hooks().setups.lock(), 1);

        client.shutdown();
        client.closed().await;
        assert!(client.is_closed());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);

        let err = ProxyClient::connect(
            ClientOptions::new()
                .with_host("127.0.0.1")
                .with_port(port)
                .with_connect_timeout(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

        assert!(err.is_connection_error());
    }
}
