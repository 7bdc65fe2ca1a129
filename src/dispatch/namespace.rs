//! Namespace handler registry and event fan-out.

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;
use tracing::{debug, error, trace};

use crate::protocol::Arg;
use crate::protocol::event;

use super::{Emitter, ProxyHandler, WriteRequest};

// ============================================================================
// Dispatch Table
// ============================================================================

/// Delivers one decoded event to one handler.
type Callback = fn(&dyn ProxyHandler, &Emitter, &EventArgs<'_>);

/// Event name to handler callback, built once.
static DISPATCH_TABLE: LazyLock<FxHashMap<&'static str, Callback>> = LazyLock::new(|| {
    let entries: [(&'static str, Callback); 14] = [
        (event::APP_STATUS, |h, e, a| h.status_updated(e, a.arg(0))),
        (event::APP_TARGET, |h, e, a| h.target_selected(e, a.str(0))),
        (event::APP_CONNECT, |h, e, a| h.client_connected(e, a.str(0))),
        (event::APP_DISCONNECT, |h, e, a| {
            h.client_disconnected(e, a.str(0));
        }),
        (event::PERIPHERAL, |h, e, a| {
            h.device_found(e, a.str(0), a.str(1), a.i64(2));
        }),
        (event::READY, |h, e, _| h.proxy_ready(e)),
        (event::DATA, |h, e, a| {
            h.notification_data(e, a.str(0), a.str(1), &a.bytes(2));
        }),
        (event::BLE_WRITE_RESP, |h, e, a| {
            h.write_response(e, a.str(0), a.str(1), a.arg(2));
        }),
        (event::BLE_READ_RESP, |h, e, a| {
            h.read_response(e, a.str(0), a.str(1), &a.bytes(2));
        }),
        (event::BLE_NOTIFY_RESP, |h, e, a| {
            h.notify_response(e, a.str(0), a.str(1));
        }),
        (event::PROFILE, |h, e, a| h.profile_updated(e, a.arg(0))),
        (event::PROXY_WRITE, |h, e, a| h.write_request(e, &a.write_request())),
        (event::PROXY_READ, |h, e, a| {
            h.read_request(e, a.str(0), a.str(1), a.u64(2));
        }),
        (event::PROXY_NOTIFY, |h, e, a| {
            h.notify_request(e, a.str(0), a.str(1), a.bool(2));
        }),
    ];
    entries.into_iter().collect()
});

// ============================================================================
// EventArgs
// ============================================================================

/// Positional event arguments with lenient accessors.
///
/// Missing or mistyped arguments read as empty/zero/false.
struct EventArgs<'a>(&'a [Arg]);

/// Stand-in for a missing argument.
static NULL_ARG: Arg = Arg::Json(Value::Null);

impl<'a> EventArgs<'a> {
    fn arg(&self, index: usize) -> &'a Arg {
        self.0.get(index).unwrap_or(&NULL_ARG)
    }

    fn str(&self, index: usize) -> &'a str {
        self.arg(index).as_str().unwrap_or_default()
    }

    fn u64(&self, index: usize) -> u64 {
        self.arg(index).as_u64().unwrap_or_default()
    }

    fn i64(&self, index: usize) -> i64 {
        self.arg(index).as_i64().unwrap_or_default()
    }

    fn bool(&self, index: usize) -> bool {
        self.arg(index).as_bool().unwrap_or_default()
    }

    fn bytes(&self, index: usize) -> Vec<u8> {
        let arg = self.arg(index);
        arg.to_bytes().unwrap_or_else(|| {
            debug!(index, arg = ?arg, "Data argument is not bytes, using empty data");
            Vec::new()
        })
    }

    fn write_request(&self) -> WriteRequest {
        WriteRequest {
            service: self.str(0).to_string(),
            characteristic: self.str(1).to_string(),
            data: self.bytes(2),
            offset: self.u64(3),
            without_response: self.bool(4),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Registered handlers in insertion order.
///
/// `handlers` is replaced wholesale on every change, so a dispatch holding
/// the previous `Arc` keeps iterating an unchanged list.
#[derive(Default)]
struct Registry {
    members: FxHashSet<usize>,
    handlers: Arc<[Arc<dyn ProxyHandler>]>,
}

/// Identity of a handler: the address of its data.
fn handler_key(handler: &dyn ProxyHandler) -> usize {
    std::ptr::from_ref(handler).cast::<()>() as usize
}

// ============================================================================
// Namespace
// ============================================================================

/// One logical channel of the connection and its handler registrations.
///
/// Registration and removal may happen from any thread, including from a
/// handler callback; changes take effect from the next dispatch.
pub struct Namespace {
    emitter: Emitter,
    registry: RwLock<Registry>,
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("path", &self.emitter.path())
            .field("handlers", &self.len())
            .finish_non_exhaustive()
    }
}

impl Namespace {
    /// Creates an empty namespace that emits through `emitter`.
    #[must_use]
    pub fn new(emitter: Emitter) -> Self {
        Self {
            emitter,
            registry: RwLock::new(Registry::default()),
        }
    }

    /// Returns the namespace path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        self.emitter.path()
    }

    /// Returns the namespace's emitter.
    #[inline]
    #[must_use]
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Registers a handler.
    ///
    /// Returns `false` if it was already registered.
    pub fn register(&self, handler: Arc<dyn ProxyHandler>) -> bool {
        let mut registry = self.registry.write();
        if !registry.members.insert(handler_key(handler.as_ref())) {
            return false;
        }

        let mut handlers = registry.handlers.to_vec();
        handlers.push(handler);
        registry.handlers = handlers.into();

        debug!(path = %self.path(), count = registry.handlers.len(), "Handler registered");
        true
    }

    /// Unregisters a handler.
    ///
    /// Returns `false` if it was not registered.
    pub fn unregister(&self, handler: &dyn ProxyHandler) -> bool {
        let key = handler_key(handler);
        let mut registry = self.registry.write();
        if !registry.members.remove(&key) {
            return false;
        }

        let handlers: Vec<_> = registry
            .handlers
            .iter()
            .filter(|h| handler_key(h.as_ref()) != key)
            .cloned()
            .collect();
        registry.handlers = handlers.into();

        debug!(path = %self.path(), count = registry.handlers.len(), "Handler unregistered");
        true
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.read().handlers.len()
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the current registrations.
    fn snapshot(&self) -> Arc<[Arc<dyn ProxyHandler>]> {
        Arc::clone(&self.registry.read().handlers)
    }
}

// ============================================================================
// Namespace - Dispatch
// ============================================================================

impl Namespace {
    /// Delivers a named event to every registered handler, in order.
    ///
    /// Returns `false` for unknown event names, which are ignored.
    pub fn dispatch(&self, event: &str, args: &[Arg]) -> bool {
        let Some(callback) = DISPATCH_TABLE.get(event) else {
            trace!(event, path = %self.path(), "Ignoring unknown event");
            return false;
        };

        let args = EventArgs(args);
        self.fan_out(event, |handler| callback(handler, &self.emitter, &args));
        true
    }

    /// Delivers the namespace connect notification.
    pub fn dispatch_connect(&self) {
        self.fan_out("connect", |handler| handler.connected(&self.emitter));
    }

    /// Delivers the namespace disconnect notification.
    pub fn dispatch_disconnect(&self) {
        self.fan_out("disconnect", |handler| handler.disconnected(&self.emitter));
    }

    /// Calls `deliver` for each handler, isolating panics.
    fn fan_out(&self, event: &str, deliver: impl Fn(&dyn ProxyHandler)) {
        let handlers = self.snapshot();

        for handler in handlers.iter() {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| deliver(handler.as_ref()))) {
                error!(
                    event,
                    path = %self.path(),
                    panic = panic_message(panic.as_ref()),
                    "Handler panicked, continuing with remaining handlers"
                );
            }
        }
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic>")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::dispatch::Outgoing;

    /// Records `(tag, event)` pairs into a shared log.
    struct Recorder {
        tag: &'static str,
        log: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl Recorder {
        fn record(&self, what: String) {
            self.log.lock().push((self.tag.to_string(), what));
        }
    }

    impl ProxyHandler for Recorder {
        fn connected(&self, _emitter: &Emitter) {
            self.record("connected".into());
        }

        fn device_found(&self, _emitter: &Emitter, device: &str, name: &str, rssi: i64) {
            self.record(format!("peripheral {device} {name} {rssi}"));
        }

        fn write_request(&self, _emitter: &Emitter, request: &WriteRequest) {
            self.record(format!(
                "write {} {} {:?} {} {}",
                request.service,
                request.characteristic,
                request.data,
                request.offset,
                request.without_response
            ));
        }

        fn notification_data(
            &self,
            _emitter: &Emitter,
            service: &str,
            characteristic: &str,
            data: &[u8],
        ) {
            self.record(format!("data {service} {characteristic} {data:?}"));
        }
    }

    struct Panicker;

    impl ProxyHandler for Panicker {
        fn proxy_ready(&self, _emitter: &Emitter) {
            panic!("boom");
        }
    }

    struct ReadyCounter(Arc<Mutex<usize>>);

    impl ProxyHandler for ReadyCounter {
        fn proxy_ready(&self, _emitter: &Emitter) {
            *self.0.lock() += 1;
        }
    }

    fn namespace() -> (Namespace, mpsc::UnboundedReceiver<Outgoing>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Namespace::new(Emitter::new("", tx)), rx)
    }

    fn peripheral_args() -> Vec<Arg> {
        vec![
            Arg::from("aa:bb:cc:dd:ee:ff"),
            Arg::from("Tag"),
            Arg::Json(json!(-60)),
        ]
    }

    #[test]
    fn test_fan_out_in_registration_order() {
        let (ns, _rx) = namespace();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Arc::new(Recorder { tag: "first", log: Arc::clone(&log) });
        let second = Arc::new(Recorder { tag: "second", log: Arc::clone(&log) });

        assert!(ns.register(first.clone()));
        assert!(ns.register(second.clone()));

        assert!(ns.dispatch(event::PERIPHERAL, &peripheral_args()));

        let expected = "peripheral aa:bb:cc:dd:ee:ff Tag -60".to_string();
        assert_eq!(
            *log.lock(),
            vec![
                ("first".to_string(), expected.clone()),
                ("second".to_string(), expected.clone()),
            ]
        );

        assert!(ns.unregister(first.as_ref()));
        log.lock().clear();
        ns.dispatch(event::PERIPHERAL, &peripheral_args());

        assert_eq!(*log.lock(), vec![("second".to_string(), expected)]);
    }

    #[test]
    fn test_duplicate_register_and_idempotent_unregister() {
        let (ns, _rx) = namespace();
        let log = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(Recorder { tag: "only", log: Arc::clone(&log) });

        assert!(ns.register(handler.clone()));
        assert!(!ns.register(handler.clone()));
        assert_eq!(ns.len(), 1);

        ns.dispatch_connect();
        assert_eq!(log.lock().len(), 1);

        assert!(ns.unregister(handler.as_ref()));
        assert!(!ns.unregister(handler.as_ref()));
        assert!(ns.is_empty());
    }

    #[test]
    fn test_unknown_event_ignored() {
        let (ns, _rx) = namespace();
        let log = Arc::new(Mutex::new(Vec::new()));
        ns.register(Arc::new(Recorder { tag: "r", log: Arc::clone(&log) }));

        assert!(!ns.dispatch("future.event", &[]));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_panicking_handler_isolated() {
        let (ns, _rx) = namespace();
        let count = Arc::new(Mutex::new(0));

        ns.register(Arc::new(Panicker));
        ns.register(Arc::new(ReadyCounter(Arc::clone(&count))));

        assert!(ns.dispatch(event::READY, &[]));
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_write_request_arguments() {
        let (ns, _rx) = namespace();
        let log = Arc::new(Mutex::new(Vec::new()));
        ns.register(Arc::new(Recorder { tag: "r", log: Arc::clone(&log) }));

        let args = vec![
            Arg::from("180f"),
            Arg::from("2a19"),
            Arg::from(vec![1u8, 2]),
            Arg::from(3u64),
            Arg::from(true),
        ];
        ns.dispatch(event::PROXY_WRITE, &args);

        assert_eq!(log.lock()[0].1, "write 180f 2a19 [1, 2] 3 true");
    }

    #[test]
    fn test_missing_arguments_default() {
        let (ns, _rx) = namespace();
        let log = Arc::new(Mutex::new(Vec::new()));
        ns.register(Arc::new(Recorder { tag: "r", log: Arc::clone(&log) }));

        ns.dispatch(event::DATA, &[Arg::from("180f")]);
        assert_eq!(log.lock()[0].1, "data 180f  []");
    }

    #[test]
    fn test_non_byte_data_logged() {
        #[derive(Clone, Default)]
        struct LogBuffer(Arc<Mutex<Vec<u8>>>);

        impl std::io::Write for LogBuffer {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let (ns, _rx) = namespace();
        let log = Arc::new(Mutex::new(Vec::new()));
        ns.register(Arc::new(Recorder { tag: "r", log: Arc::clone(&log) }));

        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            ns.dispatch(
                event::DATA,
                &[Arg::from("180f"), Arg::from("2a19"), Arg::Json(json!({"level": 1}))],
            );
        });

        assert_eq!(log.lock()[0].1, "data 180f 2a19 []");
        let output = String::from_utf8(buffer.0.lock().clone()).expect("utf-8 logs");
        assert!(output.contains("Data argument is not bytes"));
    }

    /// Unregisters itself during dispatch.
    struct SelfRemover {
        ns: Arc<Namespace>,
        calls: Arc<Mutex<usize>>,
    }

    impl ProxyHandler for SelfRemover {
        fn proxy_ready(&self, _emitter: &Emitter) {
            *self.calls.lock() += 1;
            self.ns.unregister(self);
        }
    }

    #[test]
    fn test_unregister_during_dispatch_takes_effect_next_cycle() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let ns = Arc::new(Namespace::new(Emitter::new("", tx)));
        let calls = Arc::new(Mutex::new(0));
        let later = Arc::new(Mutex::new(0));

        ns.register(Arc::new(SelfRemover {
            ns: Arc::clone(&ns),
            calls: Arc::clone(&calls),
        }));
        ns.register(Arc::new(ReadyCounter(Arc::clone(&later))));

        ns.dispatch(event::READY, &[]);
        assert_eq!(*calls.lock(), 1);
        assert_eq!(*later.lock(), 1, "current cycle still reaches later handlers");
        assert_eq!(ns.len(), 1);

        ns.dispatch(event::READY, &[]);
        assert_eq!(*calls.lock(), 1);
        assert_eq!(*later.lock(), 2);
    }
}
