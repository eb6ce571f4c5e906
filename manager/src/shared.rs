//! Optional process-wide default [`TrustManager`].
//!
//! Components never reach for this themselves; it exists for hosts that want
//! a single trust domain per process without threading a handle around.

use std::sync::{Arc, OnceLock};

use crate::TrustManager;

static SHARED: OnceLock<Arc<TrustManager>> = OnceLock::new();

/// Install `manager` as the process-wide default.
///
/// Fails, handing the manager back, if a default already exists.
pub fn install(manager: Arc<TrustManager>) -> Result<(), Arc<TrustManager>> {
    SHARED.set(manager)
}

/// The process-wide default, if one was installed or initialised.
pub fn get() -> Option<Arc<TrustManager>> {
    SHARED.get().cloned()
}

/// The process-wide default, created by `init` on first use.
pub fn get_or_init(init: impl FnOnce() -> Arc<TrustManager>) -> Arc<TrustManager> {
    Arc::clone(SHARED.get_or_init(init))
}
