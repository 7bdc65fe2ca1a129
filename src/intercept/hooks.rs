//! Hook traits.
//!
//! [`Hooks`] decides what happens to each proxied operation. [`Observer`]
//! only watches; [`Sniffer`] adapts an observer into hooks that always
//! forward.

// ============================================================================
// Imports
// ============================================================================

use crate::dispatch::{Emitter, WriteRequest};

use super::outcome::{
    NotificationOutcome, Outcome, ReadOutcome, ReadResponseOutcome, SubscribeOutcome, WriteOutcome,
};

// ============================================================================
// Hooks
// ============================================================================

/// Decision functions invoked around proxy operations.
///
/// All methods default to [`Outcome::Forward`] / no-op.
#[allow(unused_variables)]
pub trait Hooks: Send + Sync {
    /// The target was found and the proxy is being set up.
    fn on_proxy_setup(&self, emitter: &Emitter) {}

    /// The proxy is connected to the target.
    fn on_proxy_ready(&self, emitter: &Emitter) {}

    /// Before a read reaches the device.
    fn on_before_read(&self, service: &str, characteristic: &str, offset: u64) -> ReadOutcome {
        Outcome::Forward
    }

    /// Before a read result is relayed to the central.
    fn on_after_read(
        &self,
        service: &str,
        characteristic: &str,
        data: &[u8],
    ) -> ReadResponseOutcome {
        Outcome::Forward
    }

    /// Before a write reaches the device.
    fn on_before_write(&self, request: &WriteRequest) -> WriteOutcome {
        Outcome::Forward
    }

    /// Before a subscription change reaches the device.
    fn on_before_subscribe(
        &self,
        service: &str,
        characteristic: &str,
        enabled: bool,
    ) -> SubscribeOutcome {
        Outcome::Forward
    }

    /// Before a notification is relayed to the central.
    fn on_before_notification(
        &self,
        service: &str,
        characteristic: &str,
        data: &[u8],
    ) -> NotificationOutcome {
        Outcome::Forward
    }
}

// ============================================================================
// Observer
// ============================================================================

/// Passive traffic callbacks.
#[allow(unused_variables)]
pub trait Observer: Send + Sync {
    /// A read result is being relayed.
    fn on_data_read(&self, service: &str, characteristic: &str, data: &[u8]) {}

    /// A write is being forwarded.
    fn on_data_write(
        &self,
        service: &str,
        characteristic: &str,
        data: &[u8],
        offset: u64,
        without_response: bool,
    ) {
    }

    /// A subscription change is being forwarded.
    fn on_subscribe_notification(&self, service: &str, characteristic: &str, enabled: bool) {}

    /// A notification is being relayed.
    fn on_notification_data(&self, service: &str, characteristic: &str, data: &[u8]) {}
}

// ============================================================================
// Sniffer
// ============================================================================

/// Hooks that report to an [`Observer`] and forward everything.
#[derive(Debug, Clone, Default)]
pub struct Sniffer<O> {
    observer: O,
}

impl<O: Observer> Sniffer<O> {
    /// Wraps `observer`.
    #[must_use]
    pub fn new(observer: O) -> Self {
        Self { observer }
    }

    /// Returns the wrapped observer.
    #[inline]
    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }
}

impl<O: Observer> Hooks for Sniffer<O> {
    fn on_after_read(
        &self,
        service: &str,
        characteristic: &str,
        data: &[u8],
    ) -> ReadResponseOutcome {
        self.observer.on_data_read(service, characteristic, data);
        Outcome::Forward
    }

    fn on_before_write(&self, request: &WriteRequest) -> WriteOutcome {
        self.observer.on_data_write(
            &request.service,
            &request.characteristic,
            &request.data,
            request.offset,
            request.without_response,
        );
        Outcome::Forward
    }

    fn on_before_subscribe(
        &self,
        service: &str,
        characteristic: &str,
        enabled: bool,
    ) -> SubscribeOutcome {
        self.observer.on_subscribe_notification(service, characteristic, enabled);
        Outcome::Forward
    }

    fn on_before_notification(
        &self,
        service: &str,
        characteristic: &str,
        data: &[u8],
    ) -> NotificationOutcome {
        self.observer.on_notification_data(service, characteristic, data);
        Outcome::Forward
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;

    #[derive(Default)]
    struct Log(Mutex<Vec<String>>);

    impl Observer for Log {
        fn on_data_read(&self, service: &str, characteristic: &str, data: &[u8]) {
            self.0.lock().push(format!("read {service} {characteristic} {data:?}"));
        }

        fn on_data_write(
            &self,
            service: &str,
            _characteristic: &str,
            data: &[u8],
            offset: u64,
            _without_response: bool,
        ) {
            self.0.lock().push(format!("write {service} {data:?} {offset}"));
        }
    }

    struct Defaults;
    impl Hooks for Defaults {}

    #[test]
    fn test_default_hooks_forward() {
        let hooks = Defaults;
        assert!(hooks.on_before_read("180f", "2a19", 0).is_forward());
        assert!(hooks.on_after_read("180f", "2a19", &[1]).is_forward());
        assert!(hooks.on_before_subscribe("180f", "2a19", true).is_forward());
        assert!(hooks.on_before_notification("180f", "2a19", &[1]).is_forward());
    }

    #[test]
    fn test_sniffer_reports_and_forwards() {
        let sniffer = Sniffer::new(Log::default());

        assert!(sniffer.on_after_read("180f", "2a19", &[0x64]).is_forward());
        let request = WriteRequest::new("1800", "2a00", vec![0x41]).with_offset(2);
        assert!(sniffer.on_before_write(&request).is_forward());
        assert!(sniffer.on_before_subscribe("180f", "2a19", true).is_forward());

        assert_eq!(
            *sniffer.observer().0.lock(),
            vec!["read 180f 2a19 [100]".to_string(), "write 1800 [65] 2".to_string()]
        );
    }
}
