//! # Call Controller
//!
//! Purpose: per-call mutable state reported back to the caller — whether the
//! call failed, its error text, and cooperative cancellation.
//!
//! A controller is owned by the caller for the lifetime of exactly one call
//! and MUST NOT be shared across concurrent calls (see concurrency notes in
//! the channel module).

use std::sync::{Arc, Mutex, Weak};

/// Placeholder for the server-side connection a controller may be bound to,
/// so a cancellation can be routed back to the connection that owns the
/// in-flight response. The proxy and server crates supply the real type;
/// the client crate only needs to hold a weak reference to it.
pub trait ServerConnectionHandle: Send + Sync {
    fn schedule_cancel(&self, callback: Box<dyn FnOnce() + Send>);
}

struct Inner {
    failed: bool,
    err_text: String,
    canceled: bool,
    cancel_callback: Option<Box<dyn FnOnce() + Send>>,
    bound_connection: Weak<dyn ServerConnectionHandle>,
}

impl Default for Inner {
    fn default() -> Self {
        Inner {
            failed: false,
            err_text: String::new(),
            canceled: false,
            cancel_callback: None,
            bound_connection: Weak::<NullConnection>::new(),
        }
    }
}

struct NullConnection;
impl ServerConnectionHandle for NullConnection {
    fn schedule_cancel(&self, callback: Box<dyn FnOnce() + Send>) {
        callback();
    }
}

/// Per-call mutable state: failure flag, error text, and advisory
/// cancellation. Cheap to clone (an `Arc` around the real state) so a
/// cancel callback can hold a handle back to the same controller.
#[derive(Clone)]
pub struct CallController {
    inner: Arc<Mutex<Inner>>,
}

impl Default for CallController {
    fn default() -> Self {
        CallController {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }
}

impl CallController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets all per-call state so the same controller instance can be
    /// reused for a subsequent, non-concurrent call.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("controller mutex poisoned");
        *inner = Inner::default();
    }

    pub fn failed(&self) -> bool {
        self.inner.lock().expect("controller mutex poisoned").failed
    }

    pub fn error_text(&self) -> String {
        self.inner.lock().expect("controller mutex poisoned").err_text.clone()
    }

    pub fn set_failed(&self, text: impl Into<String>) {
        let mut inner = self.inner.lock().expect("controller mutex poisoned");
        inner.failed = true;
        inner.err_text = text.into();
    }

    pub fn set_connection(&self, conn: Weak<dyn ServerConnectionHandle>) {
        self.inner.lock().expect("controller mutex poisoned").bound_connection = conn;
    }

    pub fn connection(&self) -> Weak<dyn ServerConnectionHandle> {
        self.inner.lock().expect("controller mutex poisoned").bound_connection.clone()
    }

    pub fn is_canceled(&self) -> bool {
        self.inner.lock().expect("controller mutex poisoned").canceled
    }

    pub fn notify_on_cancel(&self, callback: Box<dyn FnOnce() + Send>) {
        self.inner.lock().expect("controller mutex poisoned").cancel_callback = Some(callback);
    }

    /// Marks the call canceled and fires the registered callback, either on
    /// the bound connection's owning loop (if one is set and still alive)
    /// or inline.
    pub fn start_cancel(&self) {
        let (callback, conn) = {
            let mut inner = self.inner.lock().expect("controller mutex poisoned");
            if inner.canceled {
                return;
            }
            inner.canceled = true;
            (inner.cancel_callback.take(), inner.bound_connection.clone())
        };
        let Some(callback) = callback else { return };
        match conn.upgrade() {
            Some(conn) => conn.schedule_cancel(callback),
            None => callback(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn fresh_controller_is_not_failed() {
        let controller = CallController::new();
        assert!(!controller.failed());
        assert_eq!(controller.error_text(), "");
    }

    #[test]
    fn set_failed_records_text() {
        let controller = CallController::new();
        controller.set_failed("Service Unavailable: UserService");
        assert!(controller.failed());
        assert_eq!(controller.error_text(), "Service Unavailable: UserService");
    }

    #[test]
    fn reset_clears_failure_state() {
        let controller = CallController::new();
        controller.set_failed("boom");
        controller.reset();
        assert!(!controller.failed());
    }

    #[test]
    fn cancel_without_bound_connection_runs_inline() {
        let controller = CallController::new();
        let fired = Arc::new(AtomicBool::new(false));
        let fired_clone = Arc::clone(&fired);
        controller.notify_on_cancel(Box::new(move || {
            fired_clone.store(true, Ordering::SeqCst);
        }));
        controller.start_cancel();
        assert!(fired.load(Ordering::SeqCst));
        assert!(controller.is_canceled());
    }

    #[test]
    fn cancel_is_idempotent() {
        let controller = CallController::new();
        let calls = Arc::new(AtomicBool::new(false));
        let calls_clone = Arc::clone(&calls);
        controller.notify_on_cancel(Box::new(move || {
            calls_clone.store(true, Ordering::SeqCst);
        }));
        controller.start_cancel();
        controller.start_cancel();
        assert!(calls.load(Ordering::SeqCst));
    }
}
