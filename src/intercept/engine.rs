//! Interception engine.
//!
//! Sits between the central and the device: every request the proxy relays
//! passes through a [`Hooks`] decision before anything reaches the device,
//! and every response passes through one before reaching the central.
//!
//! # Operation States
//!
//! ```text
//! Requested ──► ForwardedToDevice ──► ResponseForwarded
//!     │                           ├─► ResponseModified
//!     │                           └─► ResponseShortCircuited
//!     └──────► ShortCircuited
//! ```
//!
//! Requests and responses are paired by operation kind and
//! `(service, characteristic)`; the proxy protocol carries no request id.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, info, warn};

use crate::dispatch::{Emitter, ProxyHandler, WriteRequest, no_error};
use crate::error::Result;
use crate::identifiers::CharacteristicKey;
use crate::protocol::Arg;

use super::hooks::{Hooks, Observer, Sniffer};
use super::outcome::Outcome;

// ============================================================================
// Operation State
// ============================================================================

/// Kind of proxied operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Characteristic read.
    Read,
    /// Characteristic write.
    Write,
    /// Notification subscription.
    Subscribe,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Subscribe => "subscribe",
        })
    }
}

/// Where an operation instance stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// Received from the central, hook not yet decided.
    Requested,
    /// Sent on to the device, awaiting its response.
    ForwardedToDevice,
    /// Answered by the hook without contacting the device.
    ShortCircuited,
    /// Device response relayed unchanged.
    ResponseForwarded,
    /// Device response replaced by the hook.
    ResponseShortCircuited,
    /// Device response modified by the hook.
    ResponseModified,
}

impl OperationState {
    /// Returns `true` if no further transition is expected.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Requested | Self::ForwardedToDevice)
    }
}

type OperationKey = (Operation, CharacteristicKey);

// ============================================================================
// InterceptionEngine
// ============================================================================

/// [`ProxyHandler`] that runs every proxied operation through [`Hooks`].
///
/// Once the namespace connects, the engine restarts scanning and selects the
/// configured target when it shows up (compared case-insensitively).
pub struct InterceptionEngine<H> {
    target: String,
    hooks: H,
    operations: Mutex<FxHashMap<OperationKey, OperationState>>,
}

impl<H> fmt::Debug for InterceptionEngine<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptionEngine")
            .field("target", &self.target)
            .field("operations", &self.operations.lock().len())
            .finish_non_exhaustive()
    }
}

impl<H: Hooks> InterceptionEngine<H> {
    /// Creates an engine proxying `target` through `hooks`.
    #[must_use]
    pub fn new(target: impl Into<String>, hooks: H) -> Self {
        Self {
            target: target.into(),
            hooks,
            operations: Mutex::new(FxHashMap::default()),
        }
    }

    /// Returns the configured target address.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the hooks.
    #[inline]
    #[must_use]
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Returns the last known state of an operation.
    #[must_use]
    pub fn operation_state(
        &self,
        operation: Operation,
        service: &str,
        characteristic: &str,
    ) -> Option<OperationState> {
        let key = (operation, CharacteristicKey::new(service, characteristic));
        self.operations.lock().get(&key).copied()
    }

    /// Returns `true` if `device` is the configured target.
    #[must_use]
    pub fn matches_target(&self, device: &str) -> bool {
        device.eq_ignore_ascii_case(&self.target)
    }

    /// Starts a new operation instance.
    fn begin(&self, operation: Operation, key: &CharacteristicKey) {
        let previous = self
            .operations
            .lock()
            .insert((operation, key.clone()), OperationState::Requested);

        if previous == Some(OperationState::ForwardedToDevice) {
            warn!(
                %operation,
                service = %key.service(),
                characteristic = %key.characteristic(),
                "Request while a previous one is still pending; responses will pair ambiguously"
            );
        }
    }

    /// Moves an operation to `state`.
    fn transition(&self, operation: Operation, key: &CharacteristicKey, state: OperationState) {
        self.operations.lock().insert((operation, key.clone()), state);
    }

    /// Records a device response; returns `false` if none was pending.
    ///
    /// Only a `ForwardedToDevice` operation takes the response state; any
    /// other state is left as it was.
    fn complete(
        &self,
        operation: Operation,
        key: &CharacteristicKey,
        state: OperationState,
    ) -> bool {
        let mut operations = self.operations.lock();
        match operations.get_mut(&(operation, key.clone())) {
            Some(current) if *current == OperationState::ForwardedToDevice => {
                *current = state;
                true
            }
            _ => false,
        }
    }

    /// Runs the after-read hook and relays the result upstream.
    fn relay_read(
        &self,
        emitter: &Emitter,
        key: &CharacteristicKey,
        service: &str,
        characteristic: &str,
        data: &[u8],
    ) -> OperationState {
        let (state, relayed) = match self.hooks.on_after_read(service, characteristic, data) {
            Outcome::Forward => (OperationState::ResponseForwarded, data.to_vec()),
            Outcome::Modify(new_data) => {
                debug!(
                    service = %key.service(),
                    characteristic = %key.characteristic(),
                    "Read response modified"
                );
                (OperationState::ResponseModified, new_data)
            }
            Outcome::ShortCircuit(new_data) => {
                debug!(
                    service = %key.service(),
                    characteristic = %key.characteristic(),
                    "Read response replaced"
                );
                (OperationState::ResponseShortCircuited, new_data)
            }
        };

        report(
            emitter.proxy_read_resp(service, characteristic, &relayed),
            "proxy_read_resp",
        );
        state
    }
}

impl<O: Observer> InterceptionEngine<Sniffer<O>> {
    /// Creates a passive engine that reports traffic to `observer`.
    #[must_use]
    pub fn sniffer(target: impl Into<String>, observer: O) -> Self {
        Self::new(target, Sniffer::new(observer))
    }
}

/// Logs a failed emission.
fn report(result: Result<()>, event: &str) {
    if let Err(e) = result {
        warn!(event, error = %e, "Failed to emit event");
    }
}

// ============================================================================
// ProxyHandler Implementation
// ============================================================================

impl<H: Hooks> ProxyHandler for InterceptionEngine<H> {
    fn connected(&self, emitter: &Emitter) {
        info!(target_device = %self.target, "Connected to proxy, restarting scan");
        self.operations.lock().clear();
        report(emitter.stop(), "stop");
        report(emitter.scan(), "scan_devices");
    }

    fn disconnected(&self, _emitter: &Emitter) {
        info!(target_device = %self.target, "Disconnected from proxy");
    }

    fn device_found(&self, emitter: &Emitter, device: &str, name: &str, rssi: i64) {
        if !self.matches_target(device) {
            debug!(device, name, rssi, "Ignoring device");
            return;
        }

        info!(device, name, rssi, "Target found, selecting");
        report(emitter.select_target(&self.target), "target");
        self.hooks.on_proxy_setup(emitter);
    }

    fn proxy_ready(&self, emitter: &Emitter) {
        info!(target_device = %self.target, "Proxy ready");
        self.hooks.on_proxy_ready(emitter);
    }

    fn read_request(&self, emitter: &Emitter, service: &str, characteristic: &str, offset: u64) {
        let key = CharacteristicKey::new(service, characteristic);
        self.begin(Operation::Read, &key);

        match self.hooks.on_before_read(service, characteristic, offset) {
            Outcome::ShortCircuit(data) => {
                debug!(service, characteristic, "Read short-circuited");
                self.transition(Operation::Read, &key, OperationState::ShortCircuited);
                self.relay_read(emitter, &key, service, characteristic, &data);
            }
            Outcome::Forward | Outcome::Modify(()) => {
                self.transition(Operation::Read, &key, OperationState::ForwardedToDevice);
                report(emitter.device_read(service, characteristic), "ble_read");
            }
        }
    }

    fn read_response(&self, emitter: &Emitter, service: &str, characteristic: &str, data: &[u8]) {
        let key = CharacteristicKey::new(service, characteristic);
        let state = self.relay_read(emitter, &key, service, characteristic, data);

        if !self.complete(Operation::Read, &key, state) {
            debug!(service, characteristic, "Read response without a pending request");
        }
    }

    fn write_request(&self, emitter: &Emitter, request: &WriteRequest) {
        let key = CharacteristicKey::new(&request.service, &request.characteristic);
        self.begin(Operation::Write, &key);

        let (state, result) = match self.hooks.on_before_write(request) {
            Outcome::Forward => (
                OperationState::ForwardedToDevice,
                emitter.device_write(
                    &request.service,
                    &request.characteristic,
                    &request.data,
                    request.offset,
                    request.without_response,
                ),
            ),
            Outcome::Modify(modified) => {
                debug!(
                    service = %request.service,
                    characteristic = %request.characteristic,
                    "Write modified"
                );
                (
                    OperationState::ForwardedToDevice,
                    emitter.device_write(
                        &request.service,
                        &request.characteristic,
                        &modified.data,
                        modified.offset,
                        modified.without_response,
                    ),
                )
            }
            Outcome::ShortCircuit(()) => {
                debug!(
                    service = %request.service,
                    characteristic = %request.characteristic,
                    "Write short-circuited"
                );
                (
                    OperationState::ShortCircuited,
                    emitter.proxy_write_resp(
                        &request.service,
                        &request.characteristic,
                        no_error(),
                    ),
                )
            }
        };

        self.transition(Operation::Write, &key, state);
        report(result, "write");
    }

    fn write_response(&self, emitter: &Emitter, service: &str, characteristic: &str, error: &Arg) {
        let key = CharacteristicKey::new(service, characteristic);
        if !self.complete(Operation::Write, &key, OperationState::ResponseForwarded) {
            debug!(service, characteristic, "Write response without a pending request");
        }
        report(
            emitter.proxy_write_resp(service, characteristic, error.clone()),
            "proxy_write_resp",
        );
    }

    fn notify_request(
        &self,
        emitter: &Emitter,
        service: &str,
        characteristic: &str,
        enabled: bool,
    ) {
        let key = CharacteristicKey::new(service, characteristic);
        self.begin(Operation::Subscribe, &key);

        match self.hooks.on_before_subscribe(service, characteristic, enabled) {
            Outcome::Forward => {
                self.transition(Operation::Subscribe, &key, OperationState::ForwardedToDevice);
                report(emitter.device_notify(service, characteristic, enabled), "ble_notify");
            }
            Outcome::Modify(enabled) => {
                debug!(service, characteristic, enabled, "Subscription modified");
                self.transition(Operation::Subscribe, &key, OperationState::ForwardedToDevice);
                report(emitter.device_notify(service, characteristic, enabled), "ble_notify");
            }
            Outcome::ShortCircuit(()) => {
                debug!(service, characteristic, "Subscription short-circuited");
                self.transition(Operation::Subscribe, &key, OperationState::ShortCircuited);
                report(emitter.proxy_notify_resp(service, characteristic), "proxy_notify_resp");
            }
        }
    }

    fn notify_response(&self, emitter: &Emitter, service: &str, characteristic: &str) {
        let key = CharacteristicKey::new(service, characteristic);
        if !self.complete(Operation::Subscribe, &key, OperationState::ResponseForwarded) {
            debug!(service, characteristic, "Subscription response without a pending request");
        }
        report(emitter.proxy_notify_resp(service, characteristic), "proxy_notify_resp");
    }

    fn notification_data(
        &self,
        emitter: &Emitter,
        service: &str,
        characteristic: &str,
        data: &[u8],
    ) {
        match self.hooks.on_before_notification(service, characteristic, data) {
            Outcome::Forward => {
                report(emitter.proxy_notify_data(service, characteristic, data), "proxy_data");
            }
            Outcome::Modify(new_data) => {
                debug!(service, characteristic, "Notification modified");
                report(
                    emitter.proxy_notify_data(service, characteristic, &new_data),
                    "proxy_data",
                );
            }
            Outcome::ShortCircuit(()) => {
                debug!(service, characteristic, "Notification suppressed");
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
