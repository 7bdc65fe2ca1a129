//! Length-prefixed frame codec.
//!
//! A transport payload carries one or more frames. Each frame is prefixed
//! with a binary length header:
//!
//! ```text
//! 0x00 <d1> <d2> ... <dn> 0xFF <type digit> <payload bytes>
//! ```
//!
//! where `d1..dn` are the decimal digits of the frame body length, each
//! stored as its numeric value (`0x01 0x02` for 12), and the body starts
//! with the packet type rendered as an ASCII digit.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tracing::{debug, warn};

// ============================================================================
// Constants
// ============================================================================

/// Byte that opens a length header.
const LENGTH_MARKER: u8 = 0x00;

/// Byte that closes a length header.
const LENGTH_TERMINATOR: u8 = 0xFF;

// ============================================================================
// FrameType
// ============================================================================

/// Transport-level packet type carried in the first byte of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Session open, payload is the session JSON.
    Open,
    /// Session close.
    Close,
    /// Keep-alive request.
    Ping,
    /// Keep-alive reply.
    Pong,
    /// Application message (a Socket.IO packet or a binary attachment).
    Message,
    /// Transport upgrade.
    Upgrade,
    /// No-op.
    Noop,
}

impl FrameType {
    /// Returns the numeric type code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Open => 0,
            Self::Close => 1,
            Self::Ping => 2,
            Self::Pong => 3,
            Self::Message => 4,
            Self::Upgrade => 5,
            Self::Noop => 6,
        }
    }

    /// Parses a numeric type code.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Open),
            1 => Some(Self::Close),
            2 => Some(Self::Ping),
            3 => Some(Self::Pong),
            4 => Some(Self::Message),
            5 => Some(Self::Upgrade),
            6 => Some(Self::Noop),
            _ => None,
        }
    }

    /// Returns the type rendered as an ASCII digit.
    #[inline]
    #[must_use]
    pub const fn as_digit(self) -> u8 {
        b'0' + self.code()
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Message => "message",
            Self::Upgrade => "upgrade",
            Self::Noop => "noop",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Frame
// ============================================================================

/// One `(type, payload)` unit of the transport stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Transport packet type.
    pub frame_type: FrameType,
    /// Frame payload.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a frame.
    #[inline]
    #[must_use]
    pub fn new(frame_type: FrameType, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            frame_type,
            payload: payload.into(),
        }
    }

    /// Creates a `message` frame from text.
    #[inline]
    #[must_use]
    pub fn message(text: impl Into<String>) -> Self {
        Self::new(FrameType::Message, text.into().into_bytes())
    }

    /// Renders the frame body: the type digit followed by the payload.
    #[must_use]
    pub fn to_body(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.payload.len() + 1);
        body.push(self.frame_type.as_digit());
        body.extend_from_slice(&self.payload);
        body
    }

    /// Parses a single frame body.
    ///
    /// A body whose first byte is not an ASCII digit is a raw binary
    /// message and is returned whole as a `message` frame. Returns `None`
    /// for an empty body or an unknown type digit.
    #[must_use]
    pub fn parse_body(body: &[u8]) -> Option<Self> {
        let (&first, rest) = body.split_first()?;

        if !first.is_ascii_digit() {
            return Some(Self::new(FrameType::Message, body));
        }

        match FrameType::from_code(first - b'0') {
            Some(frame_type) => Some(Self::new(frame_type, rest)),
            None => {
                warn!(code = first - b'0', "Skipping frame with unknown type");
                None
            }
        }
    }

    /// Returns the payload as UTF-8 text, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Encodes frames into one length-prefixed transport payload.
#[must_use]
pub fn encode_payload(frames: &[Frame]) -> Vec<u8> {
    let mut content = Vec::new();

    for frame in frames {
        let body = frame.to_body();

        content.push(LENGTH_MARKER);
        content.extend(body.len().to_string().bytes().map(|digit| digit - b'0'));
        content.push(LENGTH_TERMINATOR);
        content.extend_from_slice(&body);
    }

    content
}

// ============================================================================
// Decoding
// ============================================================================

/// Decodes a length-prefixed transport payload.
///
/// The returned iterator is lazy; each call starts from the beginning of
/// `content`.
#[inline]
#[must_use]
pub fn decode_payload(content: &[u8]) -> FrameDecoder<'_> {
    FrameDecoder {
        content,
        position: 0,
    }
}

/// Lazy iterator over the frames of a transport payload.
///
/// Iteration ends without error when the content runs out inside a length
/// header or a frame body; a partial frame is never yielded.
#[derive(Debug, Clone)]
pub struct FrameDecoder<'a> {
    content: &'a [u8],
    position: usize,
}

impl FrameDecoder<'_> {
    /// Reads one length header, leaving the position at the frame body.
    fn read_length(&mut self) -> Option<usize> {
        let content = self.content;

        // Skip to the header marker.
        while *content.get(self.position)? != LENGTH_MARKER {
            self.position += 1;
        }
        self.position += 1;

        let mut length: usize = 0;
        loop {
            let byte = *content.get(self.position)?;
            if byte == LENGTH_TERMINATOR {
                break;
            }
            if byte > 9 {
                warn!(byte, position = self.position, "Invalid digit in frame length");
                return None;
            }
            length = length.checked_mul(10)?.checked_add(usize::from(byte))?;
            self.position += 1;
        }

        while content.get(self.position) == Some(&LENGTH_TERMINATOR) {
            self.position += 1;
        }

        Some(length)
    }
}

impl Iterator for FrameDecoder<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            let Some(length) = self.read_length() else {
                self.position = self.content.len();
                return None;
            };

            let start = self.position;
            let Some((end, body)) = start
                .checked_add(length)
                .and_then(|end| Some((end, self.content.get(start..end)?)))
            else {
                debug!(
                    expected = length,
                    available = self.content.len() - self.position,
                    "Truncated frame at end of payload"
                );
                self.position = self.content.len();
                return None;
            };
            self.position = end;

            if let Some(frame) = Frame::parse_body(body) {
                return Some(frame);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
