//! Deferred startup callbacks
//!
//! Registration of hooks and backends happens in two phases: callbacks are
//! queued here while the process assembles itself, then drained exactly once
//! before the manager materializes its hook registry. Draining twice is a
//! no-op because the queue is emptied on the first pass and every registration
//! behind it is first-wins idempotent.

use std::sync::{LazyLock, Mutex};

use tracing::trace;

static CALLBACKS: LazyLock<Mutex<Vec<fn()>>> = LazyLock::new(|| Mutex::new(Vec::new()));

/// Queue a callback to run during `do_callbacks`.
pub fn register_callback(cb: fn()) {
    CALLBACKS.lock().expect("startup callback lock poisoned").push(cb);
}

/// Drain and run all queued callbacks.
///
/// The queue lock is held while the callbacks execute, so concurrent
/// drains serialize and a caller returning from here can rely on every
/// previously queued registration having completed. Callbacks must not
/// queue further callbacks.
pub fn do_callbacks() {
    let mut guard = CALLBACKS.lock().expect("startup callback lock poisoned");
    let cbs = std::mem::take(&mut *guard);
    trace!(count = cbs.len(), "Running deferred startup callbacks");
    for cb in cbs {
        cb();
    }
}
