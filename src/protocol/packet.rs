//! Socket.IO packet codec.
//!
//! Converts between decoded packets and the text carried in a `message`
//! frame.
//!
//! # Grammar
//!
//! | Variant | Body |
//! |---------|------|
//! | Text | `[<path>,][<ack-id>]<json-args-or-empty>` |
//! | Binary | `<attachment-count>-[<path>,][<ack-id>]<json-args-with-placeholders>` |
//!
//! A full message is the packet type digit followed by the body, e.g.
//! `2/ble,["peripheral","aa:bb:cc:dd:ee:ff","Tag",-60]`.
//!
//! Decoding never fails on the JSON part: arguments that do not parse
//! become an empty list.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::identifiers::AckId;

use super::arg::{self, Arg};

// ============================================================================
// PacketType
// ============================================================================

/// Socket.IO packet type, the first digit of a message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    /// Namespace connect.
    Connect,
    /// Namespace disconnect.
    Disconnect,
    /// Event.
    Event,
    /// Acknowledgement.
    Ack,
    /// Error.
    Error,
    /// Event with binary attachments.
    BinaryEvent,
    /// Acknowledgement with binary attachments.
    BinaryAck,
}

impl PacketType {
    /// Returns the type as an ASCII digit.
    #[inline]
    #[must_use]
    pub const fn as_digit(self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::Error => '4',
            Self::BinaryEvent => '5',
            Self::BinaryAck => '6',
        }
    }

    /// Parses an ASCII digit.
    #[must_use]
    pub const fn from_digit(digit: char) -> Option<Self> {
        match digit {
            '0' => Some(Self::Connect),
            '1' => Some(Self::Disconnect),
            '2' => Some(Self::Event),
            '3' => Some(Self::Ack),
            '4' => Some(Self::Error),
            '5' => Some(Self::BinaryEvent),
            '6' => Some(Self::BinaryAck),
            _ => None,
        }
    }

    /// Returns `true` for the variants that carry attachments.
    #[inline]
    #[must_use]
    pub const fn is_binary(self) -> bool {
        matches!(self, Self::BinaryEvent | Self::BinaryAck)
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Event => "event",
            Self::Ack => "ack",
            Self::Error => "error",
            Self::BinaryEvent => "binary_event",
            Self::BinaryAck => "binary_ack",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Packet
// ============================================================================

/// A decoded text packet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Packet {
    /// Namespace path; empty for the root namespace.
    pub path: String,
    /// Acknowledgement id, absent for fire-and-forget packets.
    pub ack_id: Option<AckId>,
    /// Arguments.
    pub args: Vec<Value>,
}

impl Packet {
    /// Creates a root-namespace packet with no ack id.
    #[inline]
    #[must_use]
    pub fn new(args: Vec<Value>) -> Self {
        Self {
            path: String::new(),
            ack_id: None,
            args,
        }
    }

    /// Sets the namespace path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Sets the ack id.
    #[inline]
    #[must_use]
    pub fn with_ack_id(mut self, ack_id: AckId) -> Self {
        self.ack_id = Some(ack_id);
        self
    }

    /// Returns the event name (first argument), if it is a string.
    #[inline]
    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        self.args.first().and_then(Value::as_str)
    }
}

// ============================================================================
// BinaryPacket
// ============================================================================

/// A decoded binary packet whose attachments arrive as separate frames.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinaryPacket {
    /// Namespace path; empty for the root namespace.
    pub path: String,
    /// Acknowledgement id.
    pub ack_id: Option<AckId>,
    /// Arguments, with placeholders standing in for attachments.
    pub args: Vec<Value>,
    /// Number of out-of-band attachments announced by the packet.
    pub attachment_count: usize,
}

impl BinaryPacket {
    /// Returns placeholder indices in traversal order.
    #[must_use]
    pub fn placeholder_indices(&self) -> Vec<usize> {
        let mut indices = Vec::new();
        for value in &self.args {
            arg::collect_placeholders(value, &mut indices);
        }
        indices
    }

    /// Returns `true` if the placeholders are exactly `0..attachment_count`,
    /// each appearing once.
    #[must_use]
    pub fn placeholders_consistent(&self) -> bool {
        let indices = self.placeholder_indices();
        let distinct: BTreeSet<usize> = indices.iter().copied().collect();

        distinct.len() == indices.len()
            && indices.len() == self.attachment_count
            && distinct.iter().copied().eq(0..self.attachment_count)
    }

    /// Substitutes received attachments into the arguments.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingAttachment`](crate::Error::MissingAttachment)
    /// if a placeholder has no matching attachment.
    pub fn into_args(self, attachments: &[Vec<u8>]) -> Result<Vec<Arg>> {
        self.args
            .into_iter()
            .map(|value| Arg::reconstruct(value, attachments))
            .collect()
    }
}

// ============================================================================
// Message
// ============================================================================

/// A full message-frame payload: packet type plus body.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A text packet.
    Text {
        /// Packet type.
        packet_type: PacketType,
        /// Decoded packet.
        packet: Packet,
    },
    /// A binary packet awaiting attachments.
    Binary {
        /// Packet type.
        packet_type: PacketType,
        /// Decoded packet.
        packet: BinaryPacket,
    },
}

/// Decodes a message-frame payload.
///
/// Returns `None` if the payload is empty or starts with an unknown type.
#[must_use]
pub fn decode_message(payload: &str) -> Option<Message> {
    let mut chars = payload.chars();
    let packet_type = PacketType::from_digit(chars.next()?)?;
    let body = chars.as_str();

    Some(if packet_type.is_binary() {
        Message::Binary {
            packet_type,
            packet: decode_binary(body),
        }
    } else {
        Message::Text {
            packet_type,
            packet: decode_text(body),
        }
    })
}

/// Encodes a text message (type digit plus text body).
#[must_use]
pub fn encode_message(packet_type: PacketType, packet: &Packet) -> String {
    let mut message = String::new();
    message.push(packet_type.as_digit());
    message.push_str(&encode_text(packet));
    message
}

/// Encodes an event, choosing the binary form when any argument carries
/// binary content.
///
/// Returns the message text and the attachments to send after it.
#[must_use]
pub fn encode_event(path: &str, ack_id: Option<AckId>, args: Vec<Arg>) -> (String, Vec<Vec<u8>>) {
    if args.iter().any(Arg::is_binary) {
        let (body, attachments) = encode_binary(path, ack_id, args);
        let mut message = String::new();
        message.push(PacketType::BinaryEvent.as_digit());
        message.push_str(&body);
        return (message, attachments);
    }

    let mut unused = Vec::new();
    let packet = Packet {
        path: path.to_string(),
        ack_id,
        args: args.into_iter().map(|a| a.deconstruct(&mut unused)).collect(),
    };
    (encode_message(PacketType::Event, &packet), Vec::new())
}

// ============================================================================
// Text Variant
// ============================================================================

/// Encodes a text packet body.
#[must_use]
pub fn encode_text(packet: &Packet) -> String {
    prefix_body(&packet.path, packet.ack_id, encode_args(&packet.args))
}

/// Decodes a text packet body.
#[must_use]
pub fn decode_text(body: &str) -> Packet {
    let (path, rest) = split_path(body);
    let (ack_id, json) = split_ack_id(rest);

    Packet {
        path: path.to_string(),
        ack_id,
        args: decode_args(json),
    }
}

// ============================================================================
// Binary Variant
// ============================================================================

/// Encodes a binary packet body, pulling attachments out of `args`.
#[must_use]
pub fn encode_binary(
    path: &str,
    ack_id: Option<AckId>,
    args: Vec<Arg>,
) -> (String, Vec<Vec<u8>>) {
    let mut attachments = Vec::new();
    let values: Vec<Value> = args
        .into_iter()
        .map(|a| a.deconstruct(&mut attachments))
        .collect();

    let body = prefix_body(path, ack_id, encode_args(&values));
    (format!("{}-{body}", attachments.len()), attachments)
}

/// Decodes a binary packet body.
///
/// Only placeholders are recognised here; attachments are substituted by
/// the receiver once they have all arrived.
#[must_use]
pub fn decode_binary(body: &str) -> BinaryPacket {
    let (attachment_count, rest) = split_attachment_count(body);
    let packet = decode_text(rest);

    BinaryPacket {
        path: packet.path,
        ack_id: packet.ack_id,
        args: packet.args,
        attachment_count,
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Renders arguments as JSON, or an empty string when there are none.
fn encode_args(args: &[Value]) -> String {
    if args.is_empty() {
        return String::new();
    }
    Value::Array(args.to_vec()).to_string()
}

/// Applies the ack id and path prefixes.
fn prefix_body(path: &str, ack_id: Option<AckId>, json: String) -> String {
    let mut body = String::new();
    if !path.is_empty() {
        body.push_str(path);
        body.push(',');
    }
    if let Some(ack_id) = ack_id {
        body.push_str(&ack_id.to_string());
    }
    body.push_str(&json);
    body
}

/// Splits a leading `/path,` off the body.
fn split_path(body: &str) -> (&str, &str) {
    if !body.starts_with('/') {
        return ("", body);
    }
    body.split_once(',').unwrap_or((body, ""))
}

/// Splits a leading ack id off the body.
///
/// The digit run counts as an ack id only when followed by `[` or by the
/// end of the body.
fn split_ack_id(body: &str) -> (Option<AckId>, &str) {
    let digits_end = body
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(body.len());
    if digits_end == 0 {
        return (None, body);
    }

    let (digits, rest) = body.split_at(digits_end);
    if !(rest.is_empty() || rest.starts_with('[')) {
        return (None, body);
    }

    match digits.parse::<u64>() {
        Ok(value) => (Some(AckId::new(value)), rest),
        Err(_) => (None, body),
    }
}

/// Splits a leading `<count>-` off a binary body.
fn split_attachment_count(body: &str) -> (usize, &str) {
    let Some((count, rest)) = body.split_once('-') else {
        return (0, body);
    };
    if count.is_empty() || !count.bytes().all(|b| b.is_ascii_digit()) {
        return (0, body);
    }
    match count.parse::<usize>() {
        Ok(count) => (count, rest),
        Err(_) => (0, body),
    }
}

/// Parses JSON arguments, degrading to an empty list.
fn decode_args(json: &str) -> Vec<Value> {
    if json.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(json) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Null) => Vec::new(),
        Ok(other) => vec![other],
        Err(e) => {
            debug!(error = %e, "Unparseable packet arguments, using empty list");
            Vec::new()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
