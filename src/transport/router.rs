//! Frame routing.
//!
//! Turns incoming transport frames into namespace dispatches. Binary
//! packets are held until their attachments have arrived. Attachments only
//! come from binary socket messages; text frames never complete a packet.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::dispatch::Namespace;
use crate::protocol::{
    Arg, BinaryPacket, Frame, FrameType, Message, Packet, PacketType, Session, decode_message,
};

// ============================================================================
// Inbound
// ============================================================================

/// One unit read off the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A transport frame.
    Frame(Frame),
    /// Raw bytes of a binary attachment.
    Attachment(Vec<u8>),
}

// ============================================================================
// Routed
// ============================================================================

/// What the connection loop should do after a frame was routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Nothing further.
    Handled,
    /// Send this frame back to the proxy.
    Reply(Frame),
    /// The proxy opened the session.
    Opened(Session),
    /// The proxy closed the session.
    Closed,
}

// ============================================================================
// PendingBinary
// ============================================================================

/// A binary packet collecting its attachments.
#[derive(Debug)]
struct PendingBinary {
    packet_type: PacketType,
    packet: BinaryPacket,
    attachments: Vec<Vec<u8>>,
}

impl PendingBinary {
    fn is_complete(&self) -> bool {
        self.attachments.len() >= self.packet.attachment_count
    }
}

// ============================================================================
// Router
// ============================================================================

/// Routes frames to the joined namespaces.
#[derive(Debug, Default)]
pub struct Router {
    namespaces: FxHashMap<String, Arc<Namespace>>,
    pending: Option<PendingBinary>,
}

impl Router {
    /// Creates a router with no namespaces.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a namespace, keyed by its path.
    pub fn add_namespace(&mut self, namespace: Arc<Namespace>) {
        self.namespaces
            .insert(namespace.path().to_string(), namespace);
    }

    /// Returns the namespace joined at `path`.
    #[must_use]
    pub fn namespace(&self, path: &str) -> Option<&Arc<Namespace>> {
        self.namespaces.get(path)
    }

    /// Returns `true` while a binary packet awaits attachments.
    #[inline]
    #[must_use]
    pub fn has_pending_binary(&self) -> bool {
        self.pending.is_some()
    }

    /// Notifies every namespace that the connection is gone.
    pub fn disconnect_all(&mut self) {
        self.pending = None;
        for namespace in self.namespaces.values() {
            namespace.dispatch_disconnect();
        }
    }

    /// Routes one frame or attachment.
    pub fn route_inbound(&mut self, inbound: Inbound) -> Routed {
        match inbound {
            Inbound::Frame(frame) => self.route(frame),
            Inbound::Attachment(data) => {
                self.route_attachment(data);
                Routed::Handled
            }
        }
    }

    /// Routes one frame.
    pub fn route(&mut self, frame: Frame) -> Routed {
        match frame.frame_type {
            FrameType::Open => match Session::from_open_payload(&frame.payload) {
                Ok(session) => {
                    debug!(session_id = %session.id(), "Session opened");
                    Routed::Opened(session)
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring malformed open frame");
                    Routed::Handled
                }
            },
            FrameType::Close => {
                debug!("Session closed by proxy");
                Routed::Closed
            }
            FrameType::Ping => Routed::Reply(Frame::new(FrameType::Pong, frame.payload)),
            FrameType::Pong | FrameType::Upgrade | FrameType::Noop => {
                trace!(frame_type = %frame.frame_type, "Control frame");
                Routed::Handled
            }
            FrameType::Message => {
                self.route_message(frame.payload);
                Routed::Handled
            }
        }
    }

    /// Adds an attachment to the pending binary packet.
    pub fn route_attachment(&mut self, data: Vec<u8>) {
        let Some(pending) = self.pending.as_mut() else {
            debug!(len = data.len(), "Dropping attachment without a pending packet");
            return;
        };

        pending.attachments.push(data);
        trace!(
            received = pending.attachments.len(),
            expected = pending.packet.attachment_count,
            "Attachment received"
        );
        if pending.is_complete() {
            self.finish_binary();
        }
    }

    /// Routes a `message` frame payload.
    fn route_message(&mut self, payload: Vec<u8>) {
        let text = String::from_utf8_lossy(&payload);
        match decode_message(&text) {
            Some(Message::Text { packet_type, packet }) => self.route_text(packet_type, packet),
            Some(Message::Binary { packet_type, packet }) => {
                if !packet.placeholders_consistent() {
                    warn!(
                        attachment_count = packet.attachment_count,
                        placeholders = ?packet.placeholder_indices(),
                        "Dropping binary packet with mismatched placeholders"
                    );
                    return;
                }

                if let Some(stale) = self.pending.take() {
                    warn!(
                        received = stale.attachments.len(),
                        expected = stale.packet.attachment_count,
                        "Dropping incomplete binary packet"
                    );
                }

                self.pending = Some(PendingBinary {
                    packet_type,
                    packet,
                    attachments: Vec::new(),
                });
                if self.pending.as_ref().is_some_and(PendingBinary::is_complete) {
                    self.finish_binary();
                }
            }
            None => debug!(len = payload.len(), "Ignoring undecodable message"),
        }
    }

    /// Dispatches a text packet.
    fn route_text(&self, packet_type: PacketType, packet: Packet) {
        let Some(namespace) = self.namespaces.get(&packet.path) else {
            debug!(path = %packet.path, %packet_type, "Packet for a namespace not joined");
            return;
        };

        match packet_type {
            PacketType::Connect => namespace.dispatch_connect(),
            PacketType::Disconnect => namespace.dispatch_disconnect(),
            PacketType::Event => {
                dispatch_event(namespace, packet.args.into_iter().map(Arg::Json).collect());
            }
            PacketType::Ack => {
                trace!(path = %packet.path, ack_id = ?packet.ack_id, "Ignoring ack");
            }
            PacketType::Error => {
                warn!(path = %packet.path, args = ?packet.args, "Proxy reported an error");
            }
            PacketType::BinaryEvent | PacketType::BinaryAck => {
                debug!(%packet_type, "Binary packet type in text form");
            }
        }
    }

    /// Reconstructs and dispatches the pending binary packet.
    fn finish_binary(&mut self) {
        let Some(PendingBinary {
            packet_type,
            packet,
            attachments,
        }) = self.pending.take()
        else {
            return;
        };

        let path = packet.path.clone();
        let Some(namespace) = self.namespaces.get(&path) else {
            debug!(path = %path, "Binary packet for a namespace not joined");
            return;
        };

        match packet.into_args(&attachments) {
            Ok(args) if packet_type == PacketType::BinaryEvent => dispatch_event(namespace, args),
            Ok(_) => trace!(path = %path, "Ignoring binary ack"),
            Err(e) => warn!(path = %path, error = %e, "Dropping binary packet"),
        }
    }
}

/// Dispatches `[name, args...]` to a namespace.
fn dispatch_event(namespace: &Namespace, mut args: Vec<Arg>) {
    if args.is_empty() {
        debug!(path = %namespace.path(), "Event without a name");
        return;
    }

    let name = match args.remove(0) {
        Arg::Json(Value::String(name)) => name,
        other => {
            debug!(path = %namespace.path(), name = ?other, "Event name is not a string");
            return;
        }
    };

    trace!(event = %name, path = %namespace.path(), args = args.len(), "Dispatching event");
    namespace.dispatch(&name, &args);
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    use crate::dispatch::{Emitter, Outgoing, ProxyHandler};

    #[derive(Default)]
    struct Capture(Mutex<Vec<String>>);

    impl ProxyHandler for Capture {
        fn connected(&self, _emitter: &Emitter) {
            self.0.lock().push("connected".into());
        }

        fn disconnected(&self, _emitter: &Emitter) {
            self.0.lock().push("disconnected".into());
        }

        fn read_response(
            &self,
            _emitter: &Emitter,
            service: &str,
            characteristic: &str,
            data: &[u8],
        ) {
            self.0
                .lock()
                .push(format!("read {service} {characteristic} {data:?}"));
        }

        fn target_selected(&self, _emitter: &Emitter, target: &str) {
            self.0.lock().push(format!("target {target}"));
        }
    }

    fn router(path: &str) -> (Router, Arc<Capture>, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let namespace = Arc::new(Namespace::new(Emitter::new(path, tx)));
        let capture = Arc::new(Capture::default());
        namespace.register(capture.clone());

        let mut router = Router::new();
        router.add_namespace(namespace);
        (router, capture, rx)
    }

    #[test]
    fn test_open_frame_yields_session() {
        let (mut router, _, _rx) = router("");
        let frame = Frame::new(
            FrameType::Open,
            br#"{"sid":"s1","pingInterval":25000,"pingTimeout":5000,"upgrades":[]}"#.to_vec(),
        );

        match router.route(frame) {
            Routed::Opened(session) => assert_eq!(session.id(), "s1"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_malformed_open_frame_is_ignored() {
        let (mut router, _, _rx) = router("");
        assert_eq!(
            router.route(Frame::new(FrameType::Open, b"nope".to_vec())),
            Routed::Handled
        );
    }

    #[test]
    fn test_ping_answered_with_pong() {
        let (mut router, _, _rx) = router("");
        assert_eq!(
            router.route(Frame::new(FrameType::Ping, b"hello".to_vec())),
            Routed::Reply(Frame::new(FrameType::Pong, b"hello".to_vec()))
        );
    }

    #[test]
    fn test_close_frame() {
        let (mut router, _, _rx) = router("");
        assert_eq!(router.route(Frame::new(FrameType::Close, Vec::new())), Routed::Closed);
    }

    #[test]
    fn test_connect_and_event_dispatch() {
        let (mut router, capture, _rx) = router("");

        router.route(Frame::message("0"));
        router.route(Frame::message(r#"2["app.target","aa:bb:cc:dd:ee:ff"]"#));
        router.route(Frame::message("1"));

        assert_eq!(
            *capture.0.lock(),
            vec![
                "connected".to_string(),
                "target aa:bb:cc:dd:ee:ff".to_string(),
                "disconnected".to_string(),
            ]
        );
    }

    #[test]
    fn test_non_root_namespace_routing() {
        let (mut router, capture, _rx) = router("/ble");

        router.route(Frame::message(r#"2["app.target","ignored"]"#));
        router.route(Frame::message(r#"2/ble,["app.target","kept"]"#));

        assert_eq!(*capture.0.lock(), vec!["target kept".to_string()]);
    }

    #[test]
    fn test_binary_event_waits_for_attachments() {
        let (mut router, capture, _rx) = router("");

        router.route(Frame::message(
            r#"51-["ble_read_resp","180f","2a19",{"_placeholder":true,"num":0}]"#,
        ));
        assert!(router.has_pending_binary());
        assert!(capture.0.lock().is_empty());

        router.route_inbound(Inbound::Attachment(vec![0x64]));
        assert!(!router.has_pending_binary());
        assert_eq!(*capture.0.lock(), vec!["read 180f 2a19 [100]".to_string()]);
    }

    #[test]
    fn test_inconsistent_binary_packet_is_dropped() {
        let (mut router, capture, _rx) = router("");

        router.route(Frame::message(r#"51000-["ready"]"#));
        assert!(!router.has_pending_binary());

        for _ in 0..50 {
            router.route(Frame::message(r#"2["app.target","x"]"#));
        }

        assert_eq!(capture.0.lock().len(), 50);
        assert!(capture.0.lock().iter().all(|entry| entry == "target x"));
    }

    #[test]
    fn test_text_frames_pass_while_binary_is_pending() {
        let (mut router, capture, _rx) = router("");

        router.route(Frame::message(
            r#"51-["ble_read_resp","180f","2a19",{"_placeholder":true,"num":0}]"#,
        ));
        router.route(Frame::message(r#"2["app.target","aa"]"#));
        assert!(router.has_pending_binary());

        router.route_inbound(Inbound::Attachment(vec![0x01]));
        assert_eq!(
            *capture.0.lock(),
            vec!["target aa".to_string(), "read 180f 2a19 [1]".to_string()]
        );
    }

    #[test]
    fn test_attachment_without_pending_packet_is_dropped() {
        let (mut router, capture, _rx) = router("");

        router.route_attachment(vec![0x64]);

        assert!(!router.has_pending_binary());
        assert!(capture.0.lock().is_empty());
    }

    #[test]
    fn test_binary_event_without_attachments_dispatches_immediately() {
        let (mut router, capture, _rx) = router("");

        router.route(Frame::message(r#"50-["app.target","aa"]"#));

        assert!(!router.has_pending_binary());
        assert_eq!(*capture.0.lock(), vec!["target aa".to_string()]);
    }

    #[test]
    fn test_disconnect_all() {
        let (mut router, capture, _rx) = router("");
        router.disconnect_all();
        assert_eq!(*capture.0.lock(), vec!["disconnected".to_string()]);
    }

    #[test]
    fn test_garbage_message_ignored() {
        let (mut router, capture, _rx) = router("");

        router.route(Frame::message("2not json"));
        router.route(Frame::message(""));

        assert!(capture.0.lock().is_empty());
    }
}
