//! Nullable system trust: fixed verdict, counted calls.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use trustgate_manager::SystemTrust;
use trustgate_types::Certificate;

/// A system trust evaluator whose verdict is set by the test.
pub struct NullSystemTrust {
    accepts: AtomicBool,
    calls: AtomicUsize,
}

impl NullSystemTrust {
    pub fn new(accepts: bool) -> Self {
        Self {
            accepts: AtomicBool::new(accepts),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn accepting() -> Self {
        Self::new(true)
    }

    pub fn rejecting() -> Self {
        Self::new(false)
    }

    pub fn set_accepts(&self, accepts: bool) {
        self.accepts.store(accepts, Ordering::SeqCst);
    }

    /// How often the evaluator consulted the system trust.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SystemTrust for NullSystemTrust {
    fn accepts(&self, _chain: &[Certificate], _auth_type: &str) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.accepts.load(Ordering::SeqCst)
    }
}
