use crate::failure::Failure;
use bolt_packstream::Value;
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};

/// The per-request response sink (spec.md §3 Observer, glossary).
///
/// One observer is queued per request message written to the
/// connection; [`crate::Connection`] routes RECORD/SUCCESS/FAILURE/
/// IGNORED responses to whichever observer is currently at the front of
/// the queue, per the ordering invariant in spec.md §4.F. Default no-op
/// bodies let callers implement only the callback they care about — a
/// `COMMIT` observer typically only needs `on_completed`.
pub trait Observer: Send {
    /// A RECORD response: exactly one row of values.
    fn on_next(&mut self, _record: Vec<Value>) {}

    /// A SUCCESS response terminating this request's exchange.
    fn on_completed(&mut self, _metadata: IndexMap<String, Value>) {}

    /// A FAILURE response terminating this request's exchange, or an
    /// IGNORED response re-reported as the triggering FAILURE (spec.md
    /// §4.F: "users see the true cause, not a generic ignored").
    fn on_error(&mut self, _error: Failure) {}
}

/// A boxed, type-erased observer — design note §9 asks for a trait
/// object here rather than a duck-typed callback-field struct.
pub type BoxObserver = Box<dyn Observer>;

/// An observer that discards everything. Used for fire-and-forget
/// requests (GOODBYE has no response at all, so it is never queued; this
/// is for requests like a cancellation whose outcome nobody await on).
pub struct NullObserver;

impl Observer for NullObserver {}

/// Internal observer driving the connection back to `Ready` once the
/// acknowledgement message (`ack_failure`/`reset`) sent in reaction to a
/// FAILURE completes. Never exposed outside the connection.
pub(crate) struct AckObserver;

impl Observer for AckObserver {}

type Outcome = Result<IndexMap<String, Value>, Failure>;

/// A one-shot result slot shared with a [`CaptureObserver`], used to turn
/// the queue-and-poll dispatch loop back into a plain `await`-able call
/// for request/response exchanges that don't stream records (`HELLO`,
/// `BEGIN`, `COMMIT`, `ROLLBACK`, `RESET`, `ROUTE`, ...).
pub struct CaptureHandle(Arc<Mutex<Option<Outcome>>>);

impl CaptureHandle {
    pub fn take(&self) -> Option<Outcome> {
        self.0.lock().expect("capture slot mutex poisoned").take()
    }
}

struct CaptureObserver {
    slot: Arc<Mutex<Option<Outcome>>>,
}

impl Observer for CaptureObserver {
    fn on_completed(&mut self, metadata: IndexMap<String, Value>) {
        *self.slot.lock().expect("capture slot mutex poisoned") = Some(Ok(metadata));
    }

    fn on_error(&mut self, error: Failure) {
        *self.slot.lock().expect("capture slot mutex poisoned") = Some(Err(error));
    }
}

/// Build a paired observer/handle for a single request/response exchange.
pub fn capture_observer() -> (BoxObserver, CaptureHandle) {
    let slot = Arc::new(Mutex::new(None));
    (Box::new(CaptureObserver { slot: slot.clone() }), CaptureHandle(slot))
}
