//! Type-safe identifier wrappers.
//!
//! Newtypes keep acknowledgement ids and characteristic keys from being
//! mixed up with plain integers and strings.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// AckId
// ============================================================================

/// Acknowledgement id carried by a packet.
///
/// Opaque to the codec: it is transported, never computed or checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AckId(u64);

impl AckId {
    /// Creates an ack id from its numeric value.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the numeric value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for AckId {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for AckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CharacteristicKey
// ============================================================================

/// A `(service, characteristic)` pair identifying a GATT characteristic.
///
/// Requests and responses are paired by this key. UUIDs are normalised to
/// lowercase so `"180F"` and `"180f"` name the same service.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharacteristicKey {
    service: String,
    characteristic: String,
}

impl CharacteristicKey {
    /// Creates a key, normalising both UUIDs to lowercase.
    #[must_use]
    pub fn new(service: &str, characteristic: &str) -> Self {
        Self {
            service: service.to_ascii_lowercase(),
            characteristic: characteristic.to_ascii_lowercase(),
        }
    }

    /// Returns the normalised service UUID.
    #[inline]
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Returns the normalised characteristic UUID.
    #[inline]
    #[must_use]
    pub fn characteristic(&self) -> &str {
        &self.characteristic
    }
}

impl fmt::Display for CharacteristicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.service, self.characteristic)
    }
}

// ============================================================================
// Tests
// ============================================================================
