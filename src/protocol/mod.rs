//! Wire protocol codec.
//!
//! This module translates between transport bytes and decoded packets.
//!
//! # Layers
//!
//! ```text
//! transport payload ──► frame::decode_payload ──► Frame { type, payload }
//!                                                   │ (type = message)
//!                                                   ▼
//!                       packet::decode_message ──► Message::Text / Message::Binary
//!                                                   │ (+ attachment frames)
//!                                                   ▼
//!                                              event name + Vec<Arg>
//! ```
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `open` frame | Proxy → Client | Session parameters |
//! | `ping` / `pong` frame | Both | Keep-alive |
//! | `connect` packet | Both | Join a namespace |
//! | `event` packet | Both | Named event with JSON arguments |
//! | `binary_event` packet | Both | Named event with binary attachments |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Length-prefixed frame codec |
//! | `arg` | Argument values and binary placeholders |
//! | `packet` | Text and binary packet codec |
//! | `session` | Session record from the open frame |
//! | `event` | Event name table |

// ============================================================================
// Submodules
// ============================================================================

/// Argument values and binary placeholders.
pub mod arg;

/// Event name table.
pub mod event;

/// Length-prefixed frame codec.
pub mod frame;

/// Text and binary packet codec.
pub mod packet;

/// Session record.
pub mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use arg::Arg;
pub use event::OutboundEvent;
pub use frame::{Frame, FrameDecoder, FrameType, decode_payload, encode_payload};
pub use packet::{
    BinaryPacket, Message, Packet, PacketType, decode_binary, decode_message, decode_text,
    encode_binary, encode_event, encode_message, encode_text,
};
pub use session::Session;
