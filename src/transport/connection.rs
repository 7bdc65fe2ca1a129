//! WebSocket connection and event loop.
//!
//! The connection spawns a tokio task that handles:
//!
//! - Incoming frames from the proxy (routed through [`Router`])
//! - Outgoing events queued by [`Emitter`](crate::dispatch::Emitter)s
//! - Keep-alive pings every session ping interval
//! - Shutdown requests
//!
//! # WebSocket Mapping
//!
//! | WebSocket Message | Inbound |
//! |-------------------|---------|
//! | text | one frame: type digit + payload |
//! | binary starting with `0x00` | length-prefixed frame batch |
//! | binary starting with `0x04` | one attachment, type byte stripped |
//! | binary starting with a digit | one frame parsed from the body |
//! | binary, other | one attachment, whole message |

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, trace, warn};

use crate::dispatch::Outgoing;
use crate::error::{Error, Result};
use crate::protocol::{Frame, FrameType, Session, decode_payload};

use super::router::{Inbound, Routed, Router};

// ============================================================================
// Constants
// ============================================================================

/// Raw type byte prefixed to binary attachments.
const BINARY_MESSAGE_TYPE: u8 = 4;

/// First byte of a length-prefixed frame batch.
const PAYLOAD_MARKER: u8 = 0;

/// Floor for the keep-alive period.
const MIN_PING_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// Frame Mapping
// ============================================================================

/// Extracts the frames and attachments carried by one WebSocket message.
#[must_use]
pub fn inbound_from_message(message: &WsMessage) -> Vec<Inbound> {
    match message {
        WsMessage::Text(text) => Frame::parse_body(text.as_bytes())
            .map(Inbound::Frame)
            .into_iter()
            .collect(),
        WsMessage::Binary(data) => match data.first() {
            Some(&PAYLOAD_MARKER) => decode_payload(data).map(Inbound::Frame).collect(),
            Some(&BINARY_MESSAGE_TYPE) => vec![Inbound::Attachment(data[1..].to_vec())],
            Some(first) if first.is_ascii_digit() => Frame::parse_body(data)
                .map(Inbound::Frame)
                .into_iter()
                .collect(),
            Some(_) => vec![Inbound::Attachment(data.to_vec())],
            None => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Renders a frame as a text WebSocket message.
#[must_use]
pub fn text_message(frame: &Frame) -> WsMessage {
    WsMessage::Text(String::from_utf8_lossy(&frame.to_body()).into_owned().into())
}

/// Renders an attachment as a binary WebSocket message.
#[must_use]
pub fn binary_message(attachment: &[u8]) -> WsMessage {
    let mut data = Vec::with_capacity(attachment.len() + 1);
    data.push(BINARY_MESSAGE_TYPE);
    data.extend_from_slice(attachment);
    WsMessage::Binary(data.into())
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
#[derive(Debug)]
enum ConnectionCommand {
    /// Close the socket and stop.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Handle on a running event loop.
#[derive(Debug, Clone)]
pub struct Connection {
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    closed_rx: watch::Receiver<bool>,
}

impl Connection {
    /// Reads frames until the proxy opens the session.
    ///
    /// Frames arriving before or alongside the open frame are routed
    /// normally.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if no open frame arrives in time
    /// - [`Error::ConnectionClosed`] if the socket closes first
    pub async fn handshake<S>(
        ws_stream: &mut WebSocketStream<S>,
        router: &mut Router,
        handshake_timeout: Duration,
    ) -> Result<Session>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let wait_open = async {
            let mut session = None;

            while session.is_none() {
                let message = match ws_stream.next().await {
                    Some(Ok(WsMessage::Close(_))) | None => return Err(Error::ConnectionClosed),
                    Some(Ok(message)) => message,
                    Some(Err(e)) => return Err(Error::WebSocket(e)),
                };

                for inbound in inbound_from_message(&message) {
                    match router.route_inbound(inbound) {
                        Routed::Opened(opened) => session = Some(opened),
                        Routed::Reply(reply) => ws_stream.send(text_message(&reply)).await?,
                        Routed::Closed => return Err(Error::ConnectionClosed),
                        Routed::Handled => {}
                    }
                }
            }

            Ok::<_, Error>(session)
        };

        let session = timeout(handshake_timeout, wait_open)
            .await
            .map_err(|_| Error::connection_timeout(handshake_timeout.as_millis() as u64))??
            .ok_or(Error::ConnectionClosed)?;

        debug!(
            session_id = %session.id(),
            ping_interval_ms = session.ping_interval().as_millis() as u64,
            "Handshake completed"
        );

        Ok(session)
    }

    /// Spawns the event loop over an open session.
    pub fn spawn<S>(
        ws_stream: WebSocketStream<S>,
        router: Router,
        outgoing_rx: mpsc::UnboundedReceiver<Outgoing>,
        ping_interval: Duration,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = watch::channel(false);

        tokio::spawn(async move {
            Self::run_event_loop(ws_stream, router, outgoing_rx, command_rx, ping_interval).await;
            let _ = closed_tx.send(true);
        });

        Self {
            command_tx,
            closed_rx,
        }
    }

    /// Asks the event loop to close the socket.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Returns `true` once the event loop has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }

    /// Waits for the event loop to stop.
    pub async fn closed(&self) {
        let mut closed_rx = self.closed_rx.clone();
        // The sender only drops after setting the flag.
        let _ = closed_rx.wait_for(|closed| *closed).await;
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop<S>(
        ws_stream: WebSocketStream<S>,
        mut router: Router,
        mut outgoing_rx: mpsc::UnboundedReceiver<Outgoing>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        ping_interval: Duration,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let ping_interval = ping_interval.max(MIN_PING_INTERVAL);
        let mut ping = interval_at(Instant::now() + ping_interval, ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        'event_loop: loop {
            tokio::select! {
                // Incoming messages from the proxy
                message = ws_read.next() => {
                    let message = match message {
                        Some(Ok(WsMessage::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }
                        Some(Ok(message)) => message,
                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }
                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }
                    };

                    for inbound in inbound_from_message(&message) {
                        match router.route_inbound(inbound) {
                            Routed::Reply(reply) => {
                                if let Err(e) = ws_write.send(text_message(&reply)).await {
                                    warn!(error = %e, "Failed to send reply frame");
                                }
                            }
                            Routed::Closed => break 'event_loop,
                            Routed::Opened(_) => debug!("Ignoring repeated open frame"),
                            Routed::Handled => {}
                        }
                    }
                }

                // Events queued by emitters
                outgoing = outgoing_rx.recv() => {
                    let Some(outgoing) = outgoing else {
                        debug!("Outgoing channel closed");
                        break;
                    };

                    if let Err(e) = Self::send_outgoing(&mut ws_write, outgoing).await {
                        warn!(error = %e, "Failed to send event");
                    }
                }

                // Keep-alive
                _ = ping.tick() => {
                    trace!("Sending ping");
                    let frame = Frame::new(FrameType::Ping, Vec::new());
                    if let Err(e) = ws_write.send(text_message(&frame)).await {
                        warn!(error = %e, "Failed to send ping");
                    }
                }

                // Commands from the client
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Shutdown) => {
                            debug!("Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }
                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        router.disconnect_all();
        debug!("Event loop terminated");
    }

    /// Encodes and sends an outgoing event with its attachments.
    async fn send_outgoing<S>(
        ws_write: &mut SplitSink<WebSocketStream<S>, WsMessage>,
        outgoing: Outgoing,
    ) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let event = outgoing.event;
        let (text, attachments) = outgoing.encode();

        ws_write.send(text_message(&Frame::message(text))).await?;
        for attachment in &attachments {
            ws_write.send(binary_message(attachment)).await?;
        }

        trace!(%event, attachments = attachments.len(), "Event sent");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use parking_lot::Mutex;
    use tokio::io::{DuplexStream, duplex};
    use tokio_tungstenite::{accept_async, client_async};

    use crate::dispatch::{Emitter, Namespace, ProxyHandler};
    use crate::protocol::{Arg, OutboundEvent, encode_payload};

    const OPEN: &str = r#"0{"sid":"abc","pingInterval":25000,"pingTimeout":60000,"upgrades":[]}"#;

    #[test]
    fn test_inbound_from_text_message() {
        let inbound = inbound_from_message(&WsMessage::Text("2hello".into()));
        assert_eq!(
            inbound,
            vec![Inbound::Frame(Frame::new(FrameType::Ping, b"hello".to_vec()))]
        );
    }

    #[test]
    fn test_inbound_from_attachment_message() {
        let inbound = inbound_from_message(&binary_message(&[0x64, 0x00]));
        assert_eq!(inbound, vec![Inbound::Attachment(vec![0x64, 0x00])]);
    }

    #[test]
    fn test_inbound_from_raw_binary_message() {
        let inbound = inbound_from_message(&WsMessage::Binary(vec![0xff, 0x01].into()));
        assert_eq!(inbound, vec![Inbound::Attachment(vec![0xff, 0x01])]);
    }

    #[test]
    fn test_text_message_is_never_an_attachment() {
        let inbound = inbound_from_message(&WsMessage::Text("4\u{1}".into()));
        assert!(matches!(inbound.as_slice(), [Inbound::Frame(_)]));
    }

    #[test]
    fn test_inbound_from_batched_payload() {
        let batch =
            encode_payload(&[Frame::message("0"), Frame::new(FrameType::Noop, Vec::new())]);
        let inbound = inbound_from_message(&WsMessage::Binary(batch.into()));
        assert_eq!(inbound.len(), 2);
        assert_eq!(
            inbound[1],
            Inbound::Frame(Frame::new(FrameType::Noop, Vec::new()))
        );
    }

    #[test]
    fn test_text_message_rendering() {
        assert_eq!(
            text_message(&Frame::message("2[\"stop\"]")),
            WsMessage::Text("42[\"stop\"]".into())
        );
    }

    #[derive(Default)]
    struct Targets(Mutex<Vec<String>>);

    impl ProxyHandler for Targets {
        fn connected(&self, emitter: &Emitter) {
            let _ = emitter.stop();
        }

        fn target_selected(&self, emitter: &Emitter, target: &str) {
            self.0.lock().push(target.to_string());
            let _ = emitter.proxy_read_resp("180f", "2a19", &[0x64]);
        }
    }

    async fn pair() -> (WebSocketStream<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (client_io, server_io) = duplex(4096);
        let server = tokio::spawn(accept_async(server_io));
        let url = "ws://localhost/socket.io/?EIO=3&transport=websocket";
        let (client, _) = client_async(url, client_io)
            .await
            .expect("client handshake");
        let server = server.await.expect("join").expect("server handshake");
        (client, server)
    }

    #[tokio::test]
    async fn test_event_loop_round_trip() {
        let (mut client, mut server) = pair().await;

        let (tx, outgoing_rx) = mpsc::unbounded_channel();
        let namespace = Arc::new(Namespace::new(Emitter::new("", tx)));
        let handler = Arc::new(Targets::default());
        namespace.register(handler.clone());
        let mut router = Router::new();
        router.add_namespace(Arc::clone(&namespace));

        server.send(WsMessage::Text(OPEN.into())).await.expect("open");
        let session = Connection::handshake(&mut client, &mut router, Duration::from_secs(5))
            .await
            .expect("session");
        assert_eq!(session.id(), "abc");

        let connection = Connection::spawn(client, router, outgoing_rx, session.ping_interval());

        server.send(WsMessage::Text("40".into())).await.expect("connect");
        let stop = server.next().await.expect("message").expect("ok");
        assert_eq!(stop, WsMessage::Text(r#"42["stop"]"#.into()));

        server
            .send(WsMessage::Text(r#"42["app.target","aa:bb"]"#.into()))
            .await
            .expect("event");
        let header = server.next().await.expect("message").expect("ok");
        assert_eq!(
            header,
            WsMessage::Text(
                r#"451-["proxy_read_resp","180f","2a19",{"_placeholder":true,"num":0}]"#.into()
            )
        );
        let attachment = server.next().await.expect("message").expect("ok");
        assert_eq!(attachment, binary_message(&[0x64]));
        assert_eq!(*handler.0.lock(), vec!["aa:bb".to_string()]);

        server.send(WsMessage::Text("2ping".into())).await.expect("ping");
        let pong = server.next().await.expect("message").expect("ok");
        assert_eq!(pong, WsMessage::Text("3ping".into()));

        namespace
            .emitter()
            .emit(OutboundEvent::Target, vec![Arg::from("cc:dd")])
            .expect("emit");
        let target = server.next().await.expect("message").expect("ok");
        assert_eq!(target, WsMessage::Text(r#"42["target","cc:dd"]"#.into()));

        connection.shutdown();
        connection.closed().await;
        assert!(connection.is_closed());
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        let (mut client, _server) = pair().await;
        let mut router = Router::new();

        let err = Connection::handshake(&mut client, &mut router, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_handshake_closed() {
        let (mut client, mut server) = pair().await;
        let mut router = Router::new();

        server.close(None).await.expect("close");
        let err = Connection::handshake(&mut client, &mut router, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }
}
