//! User-activity observation feeding the inactivity timeout

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use log::trace;

use crate::session::{epoch_millis, SessionStore};

/// Kinds of user interaction the UI layer reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    PointerDown,
    KeyDown,
    TouchStart,
    Scroll,
}

/// Shared gate and debounce state for activity reporting.
///
/// The gate opens when a session becomes active and closes on teardown, so
/// a tracker handle held by stale UI wiring turns into a no-op instead of
/// stamping a cleared session.
#[derive(Debug)]
pub(crate) struct ActivityGate {
    open: AtomicBool,
    last_stamp: AtomicI64,
    debounce_ms: i64,
}

impl ActivityGate {
    pub(crate) fn new(debounce_ms: i64) -> Self {
        Self {
            open: AtomicBool::new(false),
            last_stamp: AtomicI64::new(0),
            debounce_ms,
        }
    }

    pub(crate) fn open(&self) {
        self.last_stamp.store(epoch_millis(), Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
    }

    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

/// Cloneable handle the UI event wiring calls on every observed
/// interaction (pointer-down, key-down, touch-start, scroll).
///
/// Stamps the store at most once per debounce window while the gate is
/// open; everything else is dropped on the floor.
#[derive(Clone)]
pub struct ActivityTracker {
    gate: Arc<ActivityGate>,
    store: Weak<Mutex<SessionStore>>,
}

impl ActivityTracker {
    pub(crate) fn new(gate: Arc<ActivityGate>, store: Weak<Mutex<SessionStore>>) -> Self {
        Self { gate, store }
    }

    /// Report one user interaction
    pub fn touch(&self, kind: ActivityKind) {
        if !self.gate.is_open() {
            return;
        }
        let Some(store) = self.store.upgrade() else {
            return;
        };

        let now = epoch_millis();
        let last = self.gate.last_stamp.load(Ordering::SeqCst);
        if now - last < self.gate.debounce_ms {
            return;
        }
        // One writer wins per window; losers drop their event
        if self
            .gate
            .last_stamp
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            trace!("activity observed: {:?}", kind);
            store.lock().unwrap().update_last_activity();
        }
    }
}
