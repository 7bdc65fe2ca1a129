//! Interception outcome.

// ============================================================================
// Imports
// ============================================================================

use crate::dispatch::WriteRequest;

// ============================================================================
// Outcome
// ============================================================================

/// Decision returned by a hook.
///
/// `M` is the replacement carried by [`Outcome::Modify`], `S` the synthetic
/// result carried by [`Outcome::ShortCircuit`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Outcome<M = (), S = ()> {
    /// Proceed unchanged.
    #[default]
    Forward,
    /// Proceed with replaced arguments.
    Modify(M),
    /// Do not contact the device; answer with the given result instead.
    ShortCircuit(S),
}

impl<M, S> Outcome<M, S> {
    /// Returns `true` for [`Outcome::Forward`].
    #[inline]
    #[must_use]
    pub fn is_forward(&self) -> bool {
        matches!(self, Self::Forward)
    }

    /// Returns `true` for [`Outcome::ShortCircuit`].
    #[inline]
    #[must_use]
    pub fn is_short_circuit(&self) -> bool {
        matches!(self, Self::ShortCircuit(_))
    }

    /// Returns a short label for logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Modify(_) => "modify",
            Self::ShortCircuit(_) => "short-circuit",
        }
    }
}

// ============================================================================
// Per-Operation Aliases
// ============================================================================

/// Before a read: short-circuit with the data to answer.
pub type ReadOutcome = Outcome<(), Vec<u8>>;

/// After a read: modify or replace the data relayed upstream.
pub type ReadResponseOutcome = Outcome<Vec<u8>, Vec<u8>>;

/// Before a write: modify the request or acknowledge without writing.
pub type WriteOutcome = Outcome<WriteRequest>;

/// Before a subscription: override the flag or acknowledge without subscribing.
pub type SubscribeOutcome = Outcome<bool>;

/// Before relaying a notification: replace the data or suppress it.
pub type NotificationOutcome = Outcome<Vec<u8>>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_forward() {
        let outcome: SubscribeOutcome = Outcome::default();
        assert!(outcome.is_forward());
        assert_eq!(outcome.label(), "forward");
    }

    #[test]
    fn test_labels() {
        let modify: NotificationOutcome = Outcome::Modify(vec![1]);
        let short: ReadOutcome = Outcome::ShortCircuit(vec![0x64]);

        assert_eq!(modify.label(), "modify");
        assert!(short.is_short_circuit());
        assert_eq!(short.label(), "short-circuit");
    }
}
